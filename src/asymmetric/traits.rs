//! 定义了非对称密钥系统的核心 Trait。
use crate::common::config::CryptoConfig;
use crate::common::errors::Error;
use jsonwebtoken::{Algorithm, EncodingKey};
use std::fmt::Debug;
use zeroize::Zeroizing;

/// Public parameters of a key, in the shape a JWK publishes them.
///
/// Integers are big-endian with no leading zero bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyParameters {
    /// RSA 模数与公钥指数
    Rsa { n: Vec<u8>, e: Vec<u8> },
}

impl PublicKeyParameters {
    /// JWK `kty` value.
    pub fn key_type(&self) -> &'static str {
        match self {
            PublicKeyParameters::Rsa { .. } => "RSA",
        }
    }
}

/// `AsymmetricKeySystem` 定义了签名密钥对提供者必须实现的核心功能。
///
/// The key store, the JWK encoder and the token issuer only go through this
/// trait, so swapping the signing algorithm means adding an implementation
/// rather than touching the lifecycle or selection logic.
pub trait AsymmetricKeySystem: Send + Sync + Sized + 'static {
    /// 公钥类型
    type PublicKey: Clone + Debug + Send + Sync;

    /// 私钥类型
    type PrivateKey: Clone + Send + Sync;

    /// JWS algorithm used for signing.
    const ALGORITHM: Algorithm;

    /// JWK `alg` value matching [`Self::ALGORITHM`].
    const ALGORITHM_NAME: &'static str;

    /// 生成密钥对
    fn generate_keypair(
        config: &CryptoConfig,
    ) -> Result<(Self::PublicKey, Self::PrivateKey), Error>;

    /// 从私钥推导公钥
    fn derive_public_key(private_key: &Self::PrivateKey) -> Self::PublicKey;

    /// 导出公钥参数
    fn public_parameters(public_key: &Self::PublicKey) -> PublicKeyParameters;

    /// Builds the key `jsonwebtoken` signs with.
    fn encoding_key(private_key: &Self::PrivateKey) -> Result<EncodingKey, Error>;

    /// 将私钥导出为未加密的 PKCS#8 PEM
    fn export_private_key(private_key: &Self::PrivateKey) -> Result<Zeroizing<String>, Error>;

    /// 从未加密的 PKCS#8 PEM 导入私钥
    fn import_private_key(key_data: &str) -> Result<Self::PrivateKey, Error>;
}

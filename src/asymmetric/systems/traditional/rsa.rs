//! `RsaKeySystem` 提供基于 RSA 的签名密钥对，用于 RS256 令牌签名与 JWK 发布。

use crate::asymmetric::traits::{AsymmetricKeySystem, PublicKeyParameters};
use crate::common::config::CryptoConfig;
use crate::common::errors::Error;
use crate::common::utils::minimal_be_bytes;
use jsonwebtoken::{Algorithm, EncodingKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::rand_core::OsRng as RsaOsRng;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

/// RSA签名系统实现
///
/// Keys use the public exponent 65537; the modulus size comes from
/// [`CryptoConfig::rsa_key_bits`].
pub struct RsaKeySystem;

impl AsymmetricKeySystem for RsaKeySystem {
    type PublicKey = RsaPublicKey;
    type PrivateKey = RsaPrivateKey;

    const ALGORITHM: Algorithm = Algorithm::RS256;
    const ALGORITHM_NAME: &'static str = "RS256";

    fn generate_keypair(
        config: &CryptoConfig,
    ) -> Result<(Self::PublicKey, Self::PrivateKey), Error> {
        let bits = config.rsa_key_bits;
        let mut rsa_rng = RsaOsRng;

        let private_key = RsaPrivateKey::new(&mut rsa_rng, bits)
            .map_err(|e| Error::KeyGeneration(format!("生成RSA密钥失败: {}", e)))?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok((public_key, private_key))
    }

    fn derive_public_key(private_key: &Self::PrivateKey) -> Self::PublicKey {
        RsaPublicKey::from(private_key)
    }

    fn public_parameters(public_key: &Self::PublicKey) -> PublicKeyParameters {
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();
        PublicKeyParameters::Rsa {
            n: minimal_be_bytes(&n).to_vec(),
            e: minimal_be_bytes(&e).to_vec(),
        }
    }

    fn encoding_key(private_key: &Self::PrivateKey) -> Result<EncodingKey, Error> {
        let pem = Self::export_private_key(private_key)?;
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())?;
        Ok(key)
    }

    fn export_private_key(private_key: &Self::PrivateKey) -> Result<Zeroizing<String>, Error> {
        private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| Error::KeyEncoding(format!("RSA私钥导出失败: {}", e)))
    }

    fn import_private_key(key_data: &str) -> Result<Self::PrivateKey, Error> {
        RsaPrivateKey::from_pkcs8_pem(key_data)
            .map_err(|e| Error::KeyEncoding(format!("导入RSA私钥失败: {}", e)))
    }
}

//! JSON Web Key descriptors for publishing the public half of key entries.

use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};

use crate::asymmetric::{AsymmetricKeySystem, PublicKeyParameters};
use crate::common::errors::Error;
use crate::common::utils::to_base64url;
use crate::keys::entry::KeyEntry;

/// Public signing key in JWK form.
///
/// `n` and `e` are base64url without padding over the minimal big-endian
/// bytes of the modulus and exponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    #[serde(rename = "use")]
    pub use_: String,
    pub alg: String,
    pub n: String,
    pub e: String,
}

impl Jwk {
    /// Verifier-side key rebuilt from the published `n`/`e`.
    pub fn decoding_key(&self) -> Result<DecodingKey, Error> {
        Ok(DecodingKey::from_rsa_components(&self.n, &self.e)?)
    }
}

/// `{"keys": [...]}` document served by the JWKS endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|jwk| jwk.kid == kid)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<Jwk> for JwkSet {
    fn from_iter<I: IntoIterator<Item = Jwk>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Maps an entry's public key to its JWK. Pure and deterministic.
pub fn to_jwk<S: AsymmetricKeySystem>(entry: &KeyEntry<S>) -> Jwk {
    let parameters = S::public_parameters(entry.public_key());
    let kty = parameters.key_type().to_string();
    let PublicKeyParameters::Rsa { n, e } = parameters;

    Jwk {
        kty,
        kid: entry.kid().to_string(),
        use_: "sig".to_string(),
        alg: S::ALGORITHM_NAME.to_string(),
        n: to_base64url(&n),
        e: to_base64url(&e),
    }
}

//! Key lifecycle: entries, stores, JWK publication and start-up fixtures.

pub mod entry;
pub mod fixtures;
pub mod jwk;
pub mod store;

pub use self::entry::KeyEntry;
pub use self::fixtures::seed_fixtures;
pub use self::jwk::{Jwk, JwkSet, to_jwk};
pub use self::store::{KeyStore, MemoryKeyStore};

#[cfg(test)]
pub(crate) mod test_support {
    use super::KeyEntry;
    use crate::asymmetric::{AsymmetricKeySystem, RsaKeySystem};
    use crate::common::config::CryptoConfig;
    use chrono::{DateTime, Utc};
    use rsa::RsaPrivateKey;
    use std::sync::OnceLock;

    /// A whole-second instant, so expiry arithmetic in tests is exact.
    pub fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn shared_private_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| {
            RsaKeySystem::generate_keypair(&CryptoConfig::default())
                .unwrap()
                .1
        })
    }

    /// Entry with a pinned expiry that reuses one RSA key across tests.
    pub fn entry_with_expiry(kid: &str, expires_at: DateTime<Utc>) -> KeyEntry {
        KeyEntry::from_private_key(kid, shared_private_key().clone(), expires_at)
    }
}

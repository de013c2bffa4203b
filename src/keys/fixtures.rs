//! Start-up key fixtures.

use tracing::info;

use crate::asymmetric::AsymmetricKeySystem;
use crate::common::config::FixtureConfig;
use crate::common::errors::Error;
use crate::keys::store::KeyStore;

/// Generates the fixture keys: one that stays valid for
/// `valid_ttl_secs` and one that is created already expired.
///
/// Existing entries under the same identifiers are replaced, so restarting
/// against a durable store always yields fresh fixtures.
pub fn seed_fixtures<S, K>(store: &K, fixtures: &FixtureConfig) -> Result<(), Error>
where
    S: AsymmetricKeySystem,
    K: KeyStore<S> + ?Sized,
{
    let valid = store.generate(&fixtures.valid_kid, fixtures.valid_ttl()?)?;
    let expired = store.generate(&fixtures.expired_kid, fixtures.expired_ttl()?)?;

    info!(
        valid_kid = valid.kid(),
        valid_expires_at = %valid.expires_at(),
        expired_kid = expired.kid(),
        expired_expires_at = %expired.expires_at(),
        "Seeded fixture keys"
    );
    Ok(())
}

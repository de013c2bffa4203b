//! Application state shared by the HTTP handlers.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::config::{Config, StorageBackend};
use crate::common::errors::Error;
use crate::issuer::{IssuedToken, TokenIntent, TokenIssuer};
use crate::keys::jwk::JwkSet;
use crate::keys::store::{KeyStore, MemoryKeyStore};
#[cfg(feature = "file-storage")]
use crate::storage::PlaintextKeyStore;

/// Explicitly constructed service state: the key store, the issuer built
/// on top of it, and the configuration they came from.
pub struct AppState {
    pub store: Arc<dyn KeyStore>,
    pub issuer: TokenIssuer,
    pub config: Config,
    /// Start time for uptime calculation
    pub start_time: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub keys_total: usize,
    pub keys_unexpired: usize,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn KeyStore>) -> Arc<Self> {
        let issuer = TokenIssuer::new(Arc::clone(&store), config.issuer.clone());
        Arc::new(Self {
            store,
            issuer,
            config,
            start_time: Instant::now(),
        })
    }

    /// Builds the store selected by `config.storage` and wraps it in a state.
    pub fn from_config(config: Config) -> Result<Arc<Self>, Error> {
        let store = build_store(&config)?;
        Ok(Self::new(config, store))
    }

    /// Public keys of every unexpired entry.
    ///
    /// Publication never fails: a store error is logged and an empty set
    /// is returned.
    pub fn jwks(&self, now: DateTime<Utc>) -> JwkSet {
        match self.store.unexpired_keys(now) {
            Ok(entries) => entries.iter().map(|entry| entry.to_jwk()).collect(),
            Err(e) => {
                tracing::error!("Failed to list unexpired keys, publishing empty set: {}", e);
                JwkSet::default()
            }
        }
    }

    pub fn issue(&self, intent: TokenIntent, now: DateTime<Utc>) -> Result<IssuedToken, Error> {
        self.issuer.issue(intent, now)
    }

    pub fn health(&self, now: DateTime<Utc>) -> Result<HealthResponse, Error> {
        Ok(HealthResponse {
            status: "healthy".into(),
            version: crate::VERSION.into(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            keys_total: self.store.len()?,
            keys_unexpired: self.store.unexpired_keys(now)?.len(),
        })
    }
}

/// Creates the key store backend named by the configuration.
pub fn build_store(config: &Config) -> Result<Arc<dyn KeyStore>, Error> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory key store");
            let store: MemoryKeyStore = MemoryKeyStore::new(config.crypto.clone());
            Ok(Arc::new(store))
        }
        #[cfg(feature = "file-storage")]
        StorageBackend::File => {
            tracing::warn!(
                path = ?config.storage.key_file,
                "Using plaintext file key store, private keys are stored unencrypted"
            );
            let store: PlaintextKeyStore =
                PlaintextKeyStore::from_config(&config.storage, config.crypto.clone())?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "file-storage"))]
        StorageBackend::File => Err(Error::Configuration(
            "the file key store requires the `file-storage` feature".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::seed_fixtures;

    #[test]
    fn test_jwks_and_health_after_seeding() {
        let state = AppState::from_config(Config::default()).unwrap();
        seed_fixtures(state.store.as_ref(), &state.config.fixtures).unwrap();
        let now = Utc::now();

        let jwks = state.jwks(now);
        assert!(jwks.find("kid-valid").is_some());
        assert!(jwks.find("kid-expired").is_none());

        let health = state.health(now).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.keys_total, 2);
        assert_eq!(health.keys_unexpired, 1);
    }

    #[test]
    fn test_empty_state_publishes_empty_set() {
        let state = AppState::from_config(Config::default()).unwrap();
        let now = Utc::now();

        assert!(state.jwks(now).is_empty());
        assert!(matches!(state.issue(TokenIntent::Valid, now), Err(Error::NoValidKey)));
        assert!(matches!(state.issue(TokenIntent::Expired, now), Err(Error::NoExpiredKey)));
    }
}

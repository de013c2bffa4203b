//! # JWKS-Kit: a test JWKS and token issuer
//!
//! `jwks-kit` keeps a small set of RSA signing keys, each with an identifier
//! (`kid`) and an expiry instant. Keys that have not expired are published as
//! a JSON Web Key Set; on request a signed RS256 token is issued, either from
//! an unexpired key or, deliberately, from an expired one so that verifiers
//! can be exercised against both outcomes.
//!
//! ## Core Concepts
//!
//! - **`KeyStore`**: the query contract over key entries. `MemoryKeyStore`
//!   keeps entries in process memory, `PlaintextKeyStore` persists them in a
//!   JSON file.
//! - **`TokenIssuer`**: chooses a key for a `TokenIntent` and signs the claims.
//! - **`to_jwk`**: maps an entry's public key to its published JWK.
//! - **`server`** (feature `server`): the axum router exposing `/jwks`,
//!   `/.well-known/jwks.json`, `/auth` and `/health`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use jwks_kit::{FixtureConfig, IssuerConfig, KeyStore, MemoryKeyStore, TokenIntent, TokenIssuer};
//!
//! fn main() -> jwks_kit::Result<()> {
//!     let store: Arc<MemoryKeyStore> = Arc::new(MemoryKeyStore::default());
//!     jwks_kit::seed_fixtures(store.as_ref(), &FixtureConfig::default())?;
//!
//!     let now = Utc::now();
//!     let published: jwks_kit::JwkSet = store
//!         .unexpired_keys(now)?
//!         .iter()
//!         .map(|entry| entry.to_jwk())
//!         .collect();
//!     println!("{}", serde_json::to_string(&published)?);
//!
//!     let issuer: TokenIssuer = TokenIssuer::new(store, IssuerConfig::default());
//!     let issued = issuer.issue(TokenIntent::Expired, now)?;
//!     println!("{} signed by {}", issued.token, issued.kid);
//!     Ok(())
//! }
//! ```

pub mod asymmetric;
pub mod common;
pub mod issuer;
pub mod keys;
pub mod storage;

#[cfg(feature = "server")]
pub mod server;

pub use crate::asymmetric::{AsymmetricKeySystem, PublicKeyParameters, RsaKeySystem};
pub use crate::common::{
    Config, CryptoConfig, Error, FixtureConfig, IssuerConfig, Result, ServerConfig,
    StorageBackend, StorageConfig,
};
pub use crate::issuer::{Claims, IssuedToken, TokenIntent, TokenIssuer};
pub use crate::keys::{Jwk, JwkSet, KeyEntry, KeyStore, MemoryKeyStore, seed_fixtures, to_jwk};

#[cfg(feature = "file-storage")]
pub use crate::storage::{PlaintextKeyStore, StoredKeyRecord};

/// The version of the `jwks-kit` crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Token issuance policy.
//!
//! Two intents exist. A *valid* token is signed by an unexpired key and
//! lives for `token_lifetime_secs`. An *expired* token is signed by a key
//! whose own validity window has lapsed, and its `exp` claim is pinned to
//! that key's expiry instant so a verifier is tested against a real
//! boundary rather than an arbitrary past timestamp.
//!
//! 中文: 令牌签发策略。有效令牌由未过期密钥签名；过期令牌由已过期密钥签名，
//! 其 `exp` 声明等于该密钥的过期时间。

use chrono::{DateTime, Utc};
use jsonwebtoken::Header;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::asymmetric::{AsymmetricKeySystem, RsaKeySystem};
use crate::common::config::IssuerConfig;
use crate::common::errors::Error;
use crate::keys::entry::KeyEntry;
use crate::keys::store::KeyStore;

/// Which class of key a token request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenIntent {
    Valid,
    Expired,
}

impl TokenIntent {
    pub fn from_expired_flag(expired: bool) -> Self {
        if expired {
            TokenIntent::Expired
        } else {
            TokenIntent::Valid
        }
    }
}

/// Registered claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// A compact JWS and the identifier of the key that signed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub kid: String,
}

/// Selects a key from the store according to a [`TokenIntent`] and signs
/// the matching claims with it.
pub struct TokenIssuer<S: AsymmetricKeySystem = RsaKeySystem> {
    store: Arc<dyn KeyStore<S>>,
    config: IssuerConfig,
}

impl<S: AsymmetricKeySystem> TokenIssuer<S> {
    pub fn new(store: Arc<dyn KeyStore<S>>, config: IssuerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn KeyStore<S>> {
        &self.store
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Issues a token for `intent`, classifying keys and computing claims
    /// from the same `now`.
    pub fn issue(&self, intent: TokenIntent, now: DateTime<Utc>) -> Result<IssuedToken, Error> {
        match intent {
            TokenIntent::Valid => self.issue_valid(now),
            TokenIntent::Expired => self.issue_expired(now),
        }
    }

    /// Signs `{iat: now, exp: now + lifetime}` with an unexpired key.
    pub fn issue_valid(&self, now: DateTime<Utc>) -> Result<IssuedToken, Error> {
        let entry = self.store.any_unexpired(now)?.ok_or(Error::NoValidKey)?;
        let iat = now.timestamp();
        let claims = self.claims(iat, iat.saturating_add(self.config.token_lifetime_secs));
        sign(&entry, &claims)
    }

    /// Signs `{iat: now - backdate, exp: key expiry}` with an expired key.
    pub fn issue_expired(&self, now: DateTime<Utc>) -> Result<IssuedToken, Error> {
        let entry = self.store.any_expired(now)?.ok_or(Error::NoExpiredKey)?;
        let iat = now
            .timestamp()
            .saturating_sub(self.config.expired_backdate_secs);
        let claims = self.claims(iat, entry.expires_at().timestamp());
        sign(&entry, &claims)
    }

    fn claims(&self, iat: i64, exp: i64) -> Claims {
        Claims {
            sub: self.config.subject.clone(),
            iss: self.config.issuer.clone(),
            iat,
            exp,
        }
    }
}

fn sign<S: AsymmetricKeySystem>(
    entry: &KeyEntry<S>,
    claims: &Claims,
) -> Result<IssuedToken, Error> {
    let mut header = Header::new(S::ALGORITHM);
    header.kid = Some(entry.kid().to_string());

    let token = jsonwebtoken::encode(&header, claims, &entry.encoding_key()?)?;
    debug!(kid = entry.kid(), exp = claims.exp, "Issued token");

    Ok(IssuedToken {
        token,
        kid: entry.kid().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::store::MemoryKeyStore;
    use crate::keys::test_support::{entry_with_expiry, fixed_now};
    use chrono::Duration;
    use jsonwebtoken::errors::ErrorKind;
    use jsonwebtoken::{Algorithm, Validation, dangerous, decode, decode_header};

    fn issuer_with(entries: &[(&str, DateTime<Utc>)]) -> TokenIssuer {
        let store: MemoryKeyStore = MemoryKeyStore::default();
        for (kid, expires_at) in entries {
            store.insert(entry_with_expiry(kid, *expires_at));
        }
        TokenIssuer::new(Arc::new(store), IssuerConfig::default())
    }

    fn scenario_issuer(now: DateTime<Utc>) -> TokenIssuer {
        issuer_with(&[
            ("kid-valid", now + Duration::seconds(86400)),
            ("kid-expired", now - Duration::seconds(7200)),
        ])
    }

    fn unverified_claims(token: &str) -> Claims {
        dangerous::insecure_decode::<Claims>(token).unwrap().claims
    }

    #[test]
    fn test_valid_token_claims() {
        let now = fixed_now();
        let issued = scenario_issuer(now).issue(TokenIntent::Valid, now).unwrap();

        assert_eq!(issued.kid, "kid-valid");
        let claims = unverified_claims(&issued.token);
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.iss, "jwks-server");
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, now.timestamp() + 3600);
    }

    #[test]
    fn test_expired_token_exp_is_key_expiry() {
        let now = fixed_now();
        let issuer = scenario_issuer(now);
        let issued = issuer.issue(TokenIntent::Expired, now).unwrap();

        assert_eq!(issued.kid, "kid-expired");
        let claims = unverified_claims(&issued.token);
        assert_eq!(claims.iat, now.timestamp() - 3600);
        assert_eq!(claims.exp, (now - Duration::seconds(7200)).timestamp());
        let key = issuer.store().any_expired(now).unwrap().unwrap();
        assert_eq!(claims.exp, key.expires_at().timestamp());
    }

    #[test]
    fn test_header_carries_kid_and_rs256() {
        let now = fixed_now();
        let issued = scenario_issuer(now).issue_valid(now).unwrap();

        assert_eq!(issued.token.split('.').count(), 3);
        let header = decode_header(&issued.token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("kid-valid"));
    }

    #[test]
    fn test_expired_token_signature_valid_but_exp_rejected() {
        let now = Utc::now();
        let issuer = scenario_issuer(now);
        let issued = issuer.issue_expired(now).unwrap();
        let key = issuer.store().any_expired(now).unwrap().unwrap();
        let decoding_key = key.to_jwk().decoding_key().unwrap();

        let mut signature_only = Validation::new(Algorithm::RS256);
        signature_only.validate_exp = false;
        let data = decode::<Claims>(&issued.token, &decoding_key, &signature_only).unwrap();
        assert_eq!(data.claims.exp, key.expires_at().timestamp());

        let mut strict = Validation::new(Algorithm::RS256);
        strict.leeway = 0;
        let err = decode::<Claims>(&issued.token, &decoding_key, &strict).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn test_valid_token_verifies_against_published_jwk() {
        let now = Utc::now();
        let issuer = scenario_issuer(now);
        let issued = issuer.issue_valid(now).unwrap();
        let published = issuer.store().unexpired_keys(now).unwrap();
        let jwk = published[0].to_jwk();

        let validation = Validation::new(Algorithm::RS256);
        let data = decode::<Claims>(&issued.token, &jwk.decoding_key().unwrap(), &validation).unwrap();
        assert_eq!(data.claims.sub, "user-123");
    }

    #[test]
    fn test_empty_store_errors() {
        let now = fixed_now();
        let issuer = issuer_with(&[]);

        assert!(matches!(issuer.issue(TokenIntent::Valid, now), Err(Error::NoValidKey)));
        assert!(matches!(issuer.issue(TokenIntent::Expired, now), Err(Error::NoExpiredKey)));
    }

    #[test]
    fn test_missing_class_errors_regardless_of_other_keys() {
        let now = fixed_now();
        let only_expired = issuer_with(&[("a", now), ("b", now - Duration::days(3))]);
        assert!(matches!(only_expired.issue_valid(now), Err(Error::NoValidKey)));
        assert!(only_expired.issue_expired(now).is_ok());

        let only_valid = issuer_with(&[("a", now + Duration::seconds(1))]);
        assert!(matches!(only_valid.issue_expired(now), Err(Error::NoExpiredKey)));
    }

    #[test]
    fn test_custom_claims_config() {
        let now = fixed_now();
        let store: MemoryKeyStore = MemoryKeyStore::default();
        store.insert(entry_with_expiry("k", now + Duration::hours(1)));
        let config = IssuerConfig {
            subject: "svc".into(),
            issuer: "issuer-x".into(),
            token_lifetime_secs: 60,
            expired_backdate_secs: 10,
        };
        let issuer: TokenIssuer = TokenIssuer::new(Arc::new(store), config);
        let issued = issuer.issue_valid(now).unwrap();

        let claims = unverified_claims(&issued.token);
        assert_eq!(claims.sub, "svc");
        assert_eq!(claims.iss, "issuer-x");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_intent_from_flag() {
        assert_eq!(TokenIntent::from_expired_flag(true), TokenIntent::Expired);
        assert_eq!(TokenIntent::from_expired_flag(false), TokenIntent::Valid);
    }
}

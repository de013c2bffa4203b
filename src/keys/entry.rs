//! A single signing key and its validity window.
//!
//! 单个签名密钥及其有效期。

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::EncodingKey;
use std::fmt;

use crate::asymmetric::{AsymmetricKeySystem, RsaKeySystem};
use crate::common::config::CryptoConfig;
use crate::common::errors::Error;
use crate::keys::jwk::{Jwk, to_jwk};

/// An immutable key pair tagged with its identifier and absolute expiry.
///
/// Expiry is held at whole-second precision so the in-memory value, its
/// durable record and the `exp` claim of tokens pinned to it agree exactly.
///
/// 中文: 一个不可变的密钥对，带有标识符与绝对过期时间。
pub struct KeyEntry<S: AsymmetricKeySystem = RsaKeySystem> {
    kid: String,
    public_key: S::PublicKey,
    private_key: S::PrivateKey,
    expires_at: DateTime<Utc>,
}

impl<S: AsymmetricKeySystem> KeyEntry<S> {
    /// Generates a fresh key pair that expires `ttl` after it was created.
    ///
    /// The creation instant is read once the key pair exists, so slow key
    /// generation does not eat into `ttl`. A positive `ttl` yields an entry
    /// that is unexpired when this returns; zero or negative yields one that
    /// is already expired.
    ///
    /// 中文: 生成新的密钥对，过期时间为创建时刻加 `ttl`。`ttl` 可以为零或负数。
    pub fn generate(
        kid: impl Into<String>,
        ttl: Duration,
        config: &CryptoConfig,
    ) -> Result<Self, Error> {
        let (public_key, private_key) = S::generate_keypair(config)?;
        Ok(Self {
            kid: kid.into(),
            public_key,
            private_key,
            expires_at: expiry_after(Utc::now(), ttl),
        })
    }

    /// Rebuilds an entry from a stored private key, deriving the public half.
    pub fn from_private_key(
        kid: impl Into<String>,
        private_key: S::PrivateKey,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let public_key = S::derive_public_key(&private_key);
        Self {
            kid: kid.into(),
            public_key,
            private_key,
            expires_at: expires_at.trunc_subsecs(0),
        }
    }

    /// Identifier published as the JWK `kid` and the token header `kid`.
    ///
    /// 中文: 密钥标识符。
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Public half, the only part that is ever published.
    ///
    /// 中文: 公钥。
    pub fn public_key(&self) -> &S::PublicKey {
        &self.public_key
    }

    /// Private half used for signing and for durable export.
    ///
    /// 中文: 私钥，仅用于签名与持久化导出。
    pub fn private_key(&self) -> &S::PrivateKey {
        &self.private_key
    }

    /// Absolute expiry, always on a whole second.
    ///
    /// 中文: 绝对过期时间（整秒）。
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `true` once `now` has reached the expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Evaluates [`Self::is_expired_at`] against the current clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Public JWK descriptor for this entry.
    pub fn to_jwk(&self) -> Jwk {
        to_jwk(self)
    }

    /// Signing key for `jsonwebtoken`, rebuilt from the private key.
    ///
    /// 中文: 由私钥构建的 JWT 签名密钥。
    pub fn encoding_key(&self) -> Result<EncodingKey, Error> {
        S::encoding_key(&self.private_key)
    }
}

impl<S: AsymmetricKeySystem> fmt::Debug for KeyEntry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEntry")
            .field("kid", &self.kid)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// `now + ttl` on a whole second: rounded up for a positive `ttl` so the
/// entry never lives shorter than asked, rounded down otherwise so it is
/// expired at `now`. Saturates at the representable range.
pub(crate) fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    let latest = DateTime::<Utc>::MAX_UTC.trunc_subsecs(0);
    match now.checked_add_signed(ttl) {
        Some(exact) if ttl > Duration::zero() => {
            let floor = exact.trunc_subsecs(0);
            if floor == exact {
                exact
            } else {
                floor
                    .checked_add_signed(Duration::seconds(1))
                    .unwrap_or(latest)
            }
        }
        Some(exact) => exact.trunc_subsecs(0),
        None if ttl > Duration::zero() => latest,
        None => DateTime::<Utc>::MIN_UTC,
    }
}

//! Key stores: the query contract and the in-memory backend.
//!
//! 密钥存储：查询契约与内存后端实现。

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::info;

use crate::asymmetric::{AsymmetricKeySystem, RsaKeySystem};
use crate::common::config::CryptoConfig;
use crate::common::errors::Error;
use crate::keys::entry::KeyEntry;

/// The four operations every key store backend exposes.
///
/// All time-relative queries take the caller's `now` so that one request can
/// classify a key and build claims from the same instant. When several
/// entries qualify, [`select_one`] decides which one is returned; callers
/// should treat the choice as arbitrary.
///
/// 中文: 所有密钥存储后端必须提供的四个操作。
pub trait KeyStore<S: AsymmetricKeySystem = RsaKeySystem>: Send + Sync {
    /// Generates a fresh key pair expiring `ttl` from now and inserts it,
    /// replacing any entry stored under the same `kid`.
    fn generate(&self, kid: &str, ttl: Duration) -> Result<Arc<KeyEntry<S>>, Error>;

    /// Every entry with `expires_at > now`, ordered by `kid`.
    fn unexpired_keys(&self, now: DateTime<Utc>) -> Result<Vec<Arc<KeyEntry<S>>>, Error>;

    /// One entry with `expires_at > now`, if any.
    fn any_unexpired(&self, now: DateTime<Utc>) -> Result<Option<Arc<KeyEntry<S>>>, Error>;

    /// One entry with `expires_at <= now`, if any.
    fn any_expired(&self, now: DateTime<Utc>) -> Result<Option<Arc<KeyEntry<S>>>, Error>;

    /// Number of stored entries, expired or not.
    fn len(&self) -> Result<usize, Error>;

    fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }
}

/// Tie-break shared by all backends: latest expiry wins, then the greatest
/// `kid`. Deterministic for a given store content, nothing more.
pub(crate) fn select_one<'a, E, T, I>(candidates: I) -> Option<T>
where
    E: Ord,
    I: IntoIterator<Item = (&'a str, E, T)>,
{
    candidates
        .into_iter()
        .max_by(|(kid_a, exp_a, _), (kid_b, exp_b, _)| {
            exp_a.cmp(exp_b).then_with(|| kid_a.cmp(kid_b))
        })
        .map(|(_, _, item)| item)
}

/// 内存密钥存储
///
/// Entries are fully built before they are inserted, so concurrent readers
/// see an entry entirely or not at all.
pub struct MemoryKeyStore<S: AsymmetricKeySystem = RsaKeySystem> {
    entries: DashMap<String, Arc<KeyEntry<S>>>,
    config: CryptoConfig,
    _system: PhantomData<S>,
}

impl<S: AsymmetricKeySystem> MemoryKeyStore<S> {
    pub fn new(config: CryptoConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            _system: PhantomData,
        }
    }

    #[cfg(test)]
    pub(crate) fn insert(&self, entry: KeyEntry<S>) {
        self.entries.insert(entry.kid().to_string(), Arc::new(entry));
    }

    fn snapshot(&self) -> Vec<Arc<KeyEntry<S>>> {
        self.entries.iter().map(|r| Arc::clone(r.value())).collect()
    }

    fn pick<F>(&self, keep: F) -> Option<Arc<KeyEntry<S>>>
    where
        F: Fn(&KeyEntry<S>) -> bool,
    {
        let snapshot = self.snapshot();
        select_one(
            snapshot
                .iter()
                .filter(|entry| keep(entry))
                .map(|entry| (entry.kid(), entry.expires_at(), Arc::clone(entry))),
        )
    }
}

impl<S: AsymmetricKeySystem> Default for MemoryKeyStore<S> {
    fn default() -> Self {
        Self::new(CryptoConfig::default())
    }
}

impl<S: AsymmetricKeySystem> KeyStore<S> for MemoryKeyStore<S> {
    fn generate(&self, kid: &str, ttl: Duration) -> Result<Arc<KeyEntry<S>>, Error> {
        let entry = Arc::new(KeyEntry::generate(kid, ttl, &self.config)?);
        let replaced = self
            .entries
            .insert(kid.to_string(), Arc::clone(&entry))
            .is_some();

        info!(
            kid,
            expires_at = %entry.expires_at(),
            replaced,
            "Generated signing key"
        );
        Ok(entry)
    }

    fn unexpired_keys(&self, now: DateTime<Utc>) -> Result<Vec<Arc<KeyEntry<S>>>, Error> {
        let mut keys: Vec<_> = self
            .snapshot()
            .into_iter()
            .filter(|entry| !entry.is_expired_at(now))
            .collect();
        keys.sort_by(|a, b| a.kid().cmp(b.kid()));
        Ok(keys)
    }

    fn any_unexpired(&self, now: DateTime<Utc>) -> Result<Option<Arc<KeyEntry<S>>>, Error> {
        Ok(self.pick(|entry| !entry.is_expired_at(now)))
    }

    fn any_expired(&self, now: DateTime<Utc>) -> Result<Option<Arc<KeyEntry<S>>>, Error> {
        Ok(self.pick(|entry| entry.is_expired_at(now)))
    }

    fn len(&self) -> Result<usize, Error> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::test_support::{entry_with_expiry, fixed_now};

    fn store_with(entries: &[(&str, DateTime<Utc>)]) -> MemoryKeyStore {
        let store = MemoryKeyStore::default();
        for (kid, expires_at) in entries {
            store.insert(entry_with_expiry(kid, *expires_at));
        }
        store
    }

    fn kids(entries: &[Arc<KeyEntry>]) -> Vec<&str> {
        entries.iter().map(|e| e.kid()).collect()
    }

    #[test]
    fn test_generate_classifies_by_ttl() {
        let store: MemoryKeyStore = MemoryKeyStore::default();
        let valid = store.generate("kid-valid", Duration::seconds(86400)).unwrap();
        let expired = store.generate("kid-expired", Duration::seconds(-7200)).unwrap();
        let now = Utc::now();

        assert!(!valid.is_expired_at(now));
        assert!(expired.is_expired_at(now));
        assert_eq!(kids(&store.unexpired_keys(now).unwrap()), vec!["kid-valid"]);
        assert_eq!(store.any_unexpired(now).unwrap().unwrap().kid(), "kid-valid");
        assert_eq!(store.any_expired(now).unwrap().unwrap().kid(), "kid-expired");
        // Later than creation + ttl the valid key has lapsed too.
        let later = valid.expires_at() + Duration::seconds(1);
        assert!(store.unexpired_keys(later).unwrap().is_empty());
        assert!(store.any_unexpired(later).unwrap().is_none());
    }

    #[test]
    fn test_generate_same_kid_replaces() {
        let store: MemoryKeyStore = MemoryKeyStore::default();
        let first = store.generate("kid", Duration::seconds(-60)).unwrap();
        let second = store.generate("kid", Duration::seconds(60)).unwrap();
        let now = Utc::now();

        assert_eq!(store.len().unwrap(), 1);
        assert_ne!(first.public_key(), second.public_key());
        assert!(store.any_expired(now).unwrap().is_none());
        assert_eq!(store.any_unexpired(now).unwrap().unwrap().public_key(), second.public_key());
    }

    #[test]
    fn test_short_positive_ttl_is_unexpired_after_generate() {
        let store: MemoryKeyStore = MemoryKeyStore::new(CryptoConfig { rsa_key_bits: 1024 });
        for ttl in [Duration::seconds(1), Duration::milliseconds(900)] {
            let entry = store.generate("short", ttl).unwrap();
            let now = Utc::now();
            assert!(!entry.is_expired_at(now), "ttl {:?}", ttl);
            assert_eq!(store.any_unexpired(now).unwrap().unwrap().kid(), "short");
        }
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let store: MemoryKeyStore = MemoryKeyStore::default();
        store.generate("zero", Duration::zero()).unwrap();
        let now = Utc::now();

        assert!(store.any_unexpired(now).unwrap().is_none());
        assert_eq!(store.any_expired(now).unwrap().unwrap().kid(), "zero");
    }

    #[test]
    fn test_unexpired_keys_is_exact_partition() {
        let now = fixed_now();
        let store = store_with(&[
            ("a", now + Duration::seconds(1)),
            ("b", now),
            ("c", now - Duration::seconds(1)),
            ("d", now + Duration::days(1)),
        ]);

        let unexpired = store.unexpired_keys(now).unwrap();
        assert_eq!(kids(&unexpired), vec!["a", "d"]);
        assert!(unexpired.iter().all(|e| e.expires_at() > now));
        assert_eq!(store.len().unwrap(), 4);
    }

    #[test]
    fn test_any_queries_are_none_iff_filtered_set_empty() {
        let now = fixed_now();

        let empty: MemoryKeyStore = MemoryKeyStore::default();
        assert!(empty.is_empty().unwrap());
        assert!(empty.any_unexpired(now).unwrap().is_none());
        assert!(empty.any_expired(now).unwrap().is_none());

        let only_expired = store_with(&[("x", now), ("y", now - Duration::hours(1))]);
        assert!(only_expired.any_unexpired(now).unwrap().is_none());
        assert!(only_expired.any_expired(now).unwrap().is_some());

        let only_valid = store_with(&[("x", now + Duration::hours(1))]);
        assert!(only_valid.any_unexpired(now).unwrap().is_some());
        assert!(only_valid.any_expired(now).unwrap().is_none());
    }

    #[test]
    fn test_selected_entry_belongs_to_requested_class() {
        let now = fixed_now();
        let store = store_with(&[
            ("v1", now + Duration::hours(1)),
            ("v2", now + Duration::hours(2)),
            ("e1", now - Duration::hours(1)),
            ("e2", now - Duration::hours(2)),
        ]);

        let valid = store.any_unexpired(now).unwrap().unwrap();
        let expired = store.any_expired(now).unwrap().unwrap();
        assert!(["v1", "v2"].contains(&valid.kid()));
        assert!(["e1", "e2"].contains(&expired.kid()));
    }

    #[test]
    fn test_select_one_prefers_latest_expiry_then_kid() {
        let now = fixed_now();
        let picked = select_one(vec![
            ("a", now, 1),
            ("c", now - Duration::seconds(5), 2),
            ("b", now, 3),
        ]);
        assert_eq!(picked, Some(3));
        assert_eq!(select_one(Vec::<(&str, DateTime<Utc>, u8)>::new()), None);
    }
}

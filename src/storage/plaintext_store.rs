//! Plaintext file-backed implementation of [`KeyStore`].
// 中文: `KeyStore` 的明文文件存储实现。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::asymmetric::{AsymmetricKeySystem, RsaKeySystem};
use crate::common::config::{CryptoConfig, StorageConfig};
use crate::common::errors::Error;
use crate::keys::entry::KeyEntry;
use crate::keys::store::{KeyStore, select_one};

const FORMAT_VERSION: u32 = 1;

/// One persisted key: identifier, unencrypted PKCS#8 PEM private key and
/// expiry as unix seconds.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredKeyRecord {
    pub kid: String,
    pub key: String,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    #[serde(default = "default_format_version")]
    version: u32,
    #[serde(default)]
    keys: Vec<StoredKeyRecord>,
}

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

impl Default for KeyFile {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            keys: Vec::new(),
        }
    }
}

/// A key store that persists every entry as a record in a plaintext JSON file.
///
/// Private keys are written **unencrypted**. This backend exists so fixture
/// keys survive restarts of a test service; it is not a credential vault.
/// Put an encrypting backend behind the same [`KeyStore`] trait for anything
/// else.
///
/// Queries read the file on every call and filter records on their expiry
/// before any PEM is parsed. A record whose key cannot be parsed aborts the
/// query with [`Error::KeyLoad`] instead of being skipped.
///
/// 中文: 一个将密钥以明文 JSON 记录持久化的存储。私钥未加密保存。
pub struct PlaintextKeyStore<S: AsymmetricKeySystem = RsaKeySystem> {
    path: PathBuf,
    crypto: CryptoConfig,
    file_permissions: u32,
    write_lock: Mutex<()>,
    _system: PhantomData<S>,
}

impl<S: AsymmetricKeySystem> PlaintextKeyStore<S> {
    /// Opens the key file at `path`, creating it (and its parent
    /// directories) when it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P, crypto: CryptoConfig) -> Result<Self, Error> {
        Self::open_with_permissions(path, crypto, StorageConfig::default().file_permissions)
    }

    /// Like [`Self::open`], with `mode` applied to the key file from its
    /// first write on, including the write that creates it.
    pub fn open_with_permissions<P: AsRef<Path>>(
        path: P,
        crypto: CryptoConfig,
        mode: u32,
    ) -> Result<Self, Error> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            crypto,
            file_permissions: mode,
            write_lock: Mutex::new(()),
            _system: PhantomData,
        };

        if store.path.exists() {
            let records = store.read_records()?;
            info!(path = ?store.path, records = records.len(), "Opened key file");
        } else {
            if let Some(parent) = store.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            store.write_records(Vec::new())?;
            info!(path = ?store.path, mode = %format!("{:o}", mode), "Created empty key file");
        }

        Ok(store)
    }

    /// Opens the store described by a [`StorageConfig`].
    pub fn from_config(storage: &StorageConfig, crypto: CryptoConfig) -> Result<Self, Error> {
        Self::open_with_permissions(&storage.key_file, crypto, storage.file_permissions)
    }

    /// Unix mode applied to the key file on every write.
    pub fn with_file_permissions(mut self, mode: u32) -> Self {
        self.file_permissions = mode;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw records as currently persisted, ordered by `kid`.
    pub fn records(&self) -> Result<Vec<StoredKeyRecord>, Error> {
        self.read_records()
    }

    fn read_records(&self) -> Result<Vec<StoredKeyRecord>, Error> {
        let json = fs::read_to_string(&self.path)?;
        let file: KeyFile = serde_json::from_str(&json)?;
        if file.version != FORMAT_VERSION {
            return Err(Error::Configuration(format!(
                "key file {} has format version {}, expected {}",
                self.path.display(),
                file.version,
                FORMAT_VERSION
            )));
        }
        Ok(file.keys)
    }

    fn write_records(&self, mut keys: Vec<StoredKeyRecord>) -> Result<(), Error> {
        keys.sort_by(|a, b| a.kid.cmp(&b.kid));
        let json = serde_json::to_string_pretty(&KeyFile {
            version: FORMAT_VERSION,
            keys,
        })?;

        // 原子写入，防止在写入中断时数据损坏。
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json)?;
        set_permissions(&temp_path, self.file_permissions)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn load(record: &StoredKeyRecord) -> Result<Arc<KeyEntry<S>>, Error> {
        let private_key =
            S::import_private_key(&record.key).map_err(|e| Error::key_load(&record.kid, e))?;
        let expires_at = DateTime::from_timestamp(record.exp, 0)
            .ok_or_else(|| Error::key_load(&record.kid, "expiry timestamp out of range"))?;
        Ok(Arc::new(KeyEntry::from_private_key(
            record.kid.clone(),
            private_key,
            expires_at,
        )))
    }

    fn pick<F>(&self, keep: F) -> Result<Option<Arc<KeyEntry<S>>>, Error>
    where
        F: Fn(&StoredKeyRecord) -> bool,
    {
        let records = self.read_records()?;
        let chosen = select_one(
            records
                .iter()
                .filter(|record| keep(record))
                .map(|record| (record.kid.as_str(), record.exp, record)),
        );

        match chosen {
            Some(record) => {
                debug!(kid = %record.kid, exp = record.exp, "Selected stored key");
                Self::load(record).map(Some)
            }
            None => Ok(None),
        }
    }
}

// `expires_at > now` for a record holding whole seconds.
fn is_unexpired(record: &StoredKeyRecord, now: DateTime<Utc>) -> bool {
    record.exp > now.timestamp()
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

impl<S: AsymmetricKeySystem> KeyStore<S> for PlaintextKeyStore<S> {
    fn generate(&self, kid: &str, ttl: Duration) -> Result<Arc<KeyEntry<S>>, Error> {
        let entry = KeyEntry::<S>::generate(kid, ttl, &self.crypto)?;
        let pem = S::export_private_key(entry.private_key())?;
        let record = StoredKeyRecord {
            kid: kid.to_string(),
            key: pem.to_string(),
            exp: entry.expires_at().timestamp(),
        };

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.read_records()?;
        let before = records.len();
        records.retain(|r| r.kid != kid);
        let replaced = records.len() != before;
        records.push(record);
        self.write_records(records)?;

        info!(
            kid,
            expires_at = %entry.expires_at(),
            replaced,
            path = ?self.path,
            "Generated and persisted signing key"
        );
        Ok(Arc::new(entry))
    }

    fn unexpired_keys(&self, now: DateTime<Utc>) -> Result<Vec<Arc<KeyEntry<S>>>, Error> {
        let mut records = self.read_records()?;
        records.retain(|record| is_unexpired(record, now));
        records.sort_by(|a, b| a.kid.cmp(&b.kid));
        records.iter().map(Self::load).collect()
    }

    fn any_unexpired(&self, now: DateTime<Utc>) -> Result<Option<Arc<KeyEntry<S>>>, Error> {
        self.pick(|record| is_unexpired(record, now))
    }

    fn any_expired(&self, now: DateTime<Utc>) -> Result<Option<Arc<KeyEntry<S>>>, Error> {
        self.pick(|record| !is_unexpired(record, now))
    }

    fn len(&self) -> Result<usize, Error> {
        Ok(self.read_records()?.len())
    }
}

//! The storage module, defining how key entries are persisted.
// 中文: 存储模块，定义密钥条目的持久化方式。

#[cfg(feature = "file-storage")]
pub mod plaintext_store;

#[cfg(feature = "file-storage")]
pub use self::plaintext_store::{PlaintextKeyStore, StoredKeyRecord};

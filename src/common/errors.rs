use thiserror::Error;

/// 密钥管理与令牌签发可能遇到的错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// A valid token was requested but every stored key has expired.
    #[error("No valid key")]
    NoValidKey,

    /// An expired token was requested but no stored key has expired yet.
    #[error("No expired key available")]
    NoExpiredKey,

    /// A durable record exists but its private key could not be deserialized.
    #[error("Failed to load key '{kid}': {reason}")]
    KeyLoad { kid: String, reason: String },

    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    #[error("Key encoding error: {0}")]
    KeyEncoding(String),

    #[error("Token encoding error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("Serialization error (JSON)")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    pub(crate) fn key_load(kid: impl Into<String>, reason: impl ToString) -> Self {
        Error::KeyLoad {
            kid: kid.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error only reflects the current contents of the store
    /// (no key of the requested class) rather than a malfunction.
    pub fn is_key_unavailable(&self) -> bool {
        matches!(self, Error::NoValidKey | Error::NoExpiredKey)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

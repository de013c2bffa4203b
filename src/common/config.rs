//!
//! # 通用配置模块
//!
//! Configuration sections for key generation, token claims, key storage,
//! start-up fixtures and the HTTP listener. Every section has a `Default`
//! and the aggregate [`Config`] can be populated from environment variables.
//!
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::common::errors::{Error, Result};

/// 密钥生成参数
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CryptoConfig {
    /// RSA 模数位数
    pub rsa_key_bits: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self { rsa_key_bits: 2048 }
    }
}

/// Claims written into every issued token.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IssuerConfig {
    /// `sub` claim
    pub subject: String,
    /// `iss` claim
    pub issuer: String,
    /// Seconds between `iat` and `exp` on the valid path.
    pub token_lifetime_secs: i64,
    /// Seconds `iat` is moved into the past on the expired path.
    pub expired_backdate_secs: i64,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            subject: "user-123".to_string(),
            issuer: "jwks-server".to_string(),
            token_lifetime_secs: 3600,
            expired_backdate_secs: 3600,
        }
    }
}

/// 密钥存储后端
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 进程内存，重启后丢失
    #[default]
    Memory,
    /// 明文 JSON 文件
    File,
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            other => Err(Error::Configuration(format!(
                "unknown key store backend '{}', expected 'memory' or 'file'",
                other
            ))),
        }
    }
}

/// 存储配置
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Path of the key file used by the `file` backend.
    pub key_file: PathBuf,
    /// 持久化文件权限（Unix文件模式，如0o600）
    #[serde(default = "default_file_permissions")]
    pub file_permissions: u32,
}

fn default_file_permissions() -> u32 {
    0o600 // 等同于 -rw-------
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            key_file: PathBuf::from("./totally_not_my_privateKeys.json"),
            file_permissions: default_file_permissions(),
        }
    }
}

/// Keys generated at start-up: one that stays valid and one that is
/// already expired when it is created.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FixtureConfig {
    pub valid_kid: String,
    pub valid_ttl_secs: i64,
    pub expired_kid: String,
    pub expired_ttl_secs: i64,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            valid_kid: "kid-valid".to_string(),
            valid_ttl_secs: 24 * 3600,
            expired_kid: "kid-expired".to_string(),
            expired_ttl_secs: -7200,
        }
    }
}

impl FixtureConfig {
    /// Lifetime of the valid fixture key.
    pub fn valid_ttl(&self) -> Result<TimeDelta> {
        ttl_from_secs("VALID_KEY_TTL_SECS", self.valid_ttl_secs)
    }

    /// Lifetime of the expired fixture key, normally negative.
    pub fn expired_ttl(&self) -> Result<TimeDelta> {
        ttl_from_secs("EXPIRED_KEY_TTL_SECS", self.expired_ttl_secs)
    }
}

// chrono limits a delta to `i64::MAX` milliseconds.
fn ttl_from_secs(key: &str, secs: i64) -> Result<TimeDelta> {
    TimeDelta::try_seconds(secs).ok_or_else(|| {
        Error::Configuration(format!("{}={}: key lifetime out of range", key, secs))
    })
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// 完整配置
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub issuer: IssuerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fixtures: FixtureConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Unset variables fall back to the defaults; set but unparsable
    /// variables are reported as [`Error::Configuration`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let file_permissions = match lookup("KEY_FILE_PERMISSIONS") {
            Some(raw) => parse_octal("KEY_FILE_PERMISSIONS", &raw)?,
            None => defaults.storage.file_permissions,
        };

        let config = Self {
            crypto: CryptoConfig {
                rsa_key_bits: parse_or(&lookup, "RSA_KEY_BITS", defaults.crypto.rsa_key_bits)?,
            },
            issuer: IssuerConfig {
                subject: lookup("TOKEN_SUBJECT").unwrap_or(defaults.issuer.subject),
                issuer: lookup("TOKEN_ISSUER").unwrap_or(defaults.issuer.issuer),
                token_lifetime_secs: parse_or(
                    &lookup,
                    "TOKEN_LIFETIME_SECS",
                    defaults.issuer.token_lifetime_secs,
                )?,
                expired_backdate_secs: parse_or(
                    &lookup,
                    "EXPIRED_BACKDATE_SECS",
                    defaults.issuer.expired_backdate_secs,
                )?,
            },
            storage: StorageConfig {
                backend: parse_or(&lookup, "KEY_STORE", defaults.storage.backend)?,
                key_file: lookup("KEY_FILE")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.key_file),
                file_permissions,
            },
            fixtures: FixtureConfig {
                valid_kid: lookup("VALID_KID").unwrap_or(defaults.fixtures.valid_kid),
                valid_ttl_secs: parse_or(
                    &lookup,
                    "VALID_KEY_TTL_SECS",
                    defaults.fixtures.valid_ttl_secs,
                )?,
                expired_kid: lookup("EXPIRED_KID").unwrap_or(defaults.fixtures.expired_kid),
                expired_ttl_secs: parse_or(
                    &lookup,
                    "EXPIRED_KEY_TTL_SECS",
                    defaults.fixtures.expired_ttl_secs,
                )?,
            },
            server: ServerConfig {
                host: lookup("HOST").unwrap_or(defaults.server.host),
                port: parse_or(&lookup, "PORT", defaults.server.port)?,
            },
        };

        config.fixtures.valid_ttl()?;
        config.fixtures.expired_ttl()?;
        Ok(config)
    }

    /// `host:port` the HTTP listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Configuration(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

fn parse_octal(key: &str, raw: &str) -> Result<u32> {
    let digits = raw.trim().trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .map_err(|e| Error::Configuration(format!("{}={:?}: {}", key, raw, e)))
}

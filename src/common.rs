//! 通用模块，包含错误处理、配置与编码工具函数

pub mod config;
pub mod errors;
pub mod utils;

pub use self::config::{
    Config, CryptoConfig, FixtureConfig, IssuerConfig, ServerConfig, StorageBackend,
    StorageConfig,
};
pub use self::errors::{Error, Result};
pub use self::utils::to_base64url;

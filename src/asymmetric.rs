//! 非对称密钥系统：密钥对生成、公钥参数导出与私钥序列化

pub mod systems;
pub mod traits;

pub use self::systems::traditional::RsaKeySystem;
pub use self::traits::{AsymmetricKeySystem, PublicKeyParameters};

//! 算法系统集合
//!
//! 目前只包含传统 RSA 签名系统
pub mod traditional;

//! # ceres-core
//!
//! Ceres 频带编解码核心库, 提供错误类型、比特流读写和数值缩放配置.
//!
//! 上层 `ceres-codec` 的频带处理、残差量化和参考熵编码器都建立在本 crate 之上.

pub mod bitreader;
pub mod bitwriter;
pub mod error;
pub mod scaling;

// 重导出常用类型
pub use error::{CeresError, CeresResult};
pub use scaling::{Fixed16Scaling, Fixed32Scaling, FloatScaling, Scaling};

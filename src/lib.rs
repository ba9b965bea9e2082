//! # Ceres
//!
//! 纯 Rust 实现的 MDCT 频带处理与残差量化核心.
//!
//! Ceres 覆盖感知音频编码器中对码率和失真最敏感的内层路径:
//! - **频带能量**: 按频带、按声道的幅度提取与归一化
//! - **基音预测**: 每个基音频带的预测增益
//! - **残差量化**: 扩频旋转 + 脉冲码本, 比特预算精确到位
//! - **立体声**: 能量加权的 mid/side 旋转
//!
//! # 快速开始
//!
//! ```rust
//! use std::sync::Arc;
//! use ceres::codec::{BandDecoder, BandEncoder, Mode};
//!
//! let mode = Arc::new(Mode::standard(1, 2).unwrap());
//! let freq = vec![0.25f32; mode.spectrum_len()];
//! let pitch = vec![0.0f32; mode.spectrum_len()];
//!
//! let frame = BandEncoder::new(Arc::clone(&mode)).encode(&freq, &pitch, 200).unwrap();
//! let decoded = BandDecoder::new(mode).decode(&frame, &pitch).unwrap();
//! println!("{} 比特, {} 个系数", frame.bits_used, decoded.len());
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `ceres-core` | 错误类型、比特流读写、数值缩放 |
//! | `ceres-codec` | 频带处理、残差量化、帧级驱动 |

/// 核心类型与工具
pub use ceres_core as core;

/// 频带编解码
pub use ceres_codec as codec;

/// 获取 Ceres 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

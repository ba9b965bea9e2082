//! # ceres-codec
//!
//! Ceres 频带编解码库: 在 MDCT 频域上完成感知音频编码器的频带处理与残差量化.
//!
//! ## 主要能力
//!
//! - **频带能量**: 按频带、按声道计算 RMS 幅度
//! - **归一化**: 去除/恢复频带幅度, 得到单位范数的形状
//! - **基音增益**: 估计并施加每个基音频带的预测增益
//! - **残差量化**: 扩频旋转 + 代数脉冲矢量量化, 比特预算精确到位
//! - **立体声旋转**: 按能量加权的 mid/side 混合及其逆变换
//!
//! ## 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//! use ceres_codec::celt::{BandDecoder, BandEncoder, Mode};
//!
//! let mode = Arc::new(Mode::standard(1, 1).unwrap());
//! let freq: Vec<f32> = (0..mode.spectrum_len())
//!     .map(|i| ((i * 7 % 13) as f32 - 6.0) * 0.1)
//!     .collect();
//! let pitch = vec![0.0; mode.spectrum_len()];
//!
//! let mut encoder = BandEncoder::new(Arc::clone(&mode));
//! let frame = encoder.encode(&freq, &pitch, 320).unwrap();
//! assert!(frame.bits_used <= 320);
//!
//! let mut decoder = BandDecoder::new(mode);
//! let decoded = decoder.decode(&frame, &pitch).unwrap();
//! assert_eq!(decoder.shape(), &frame.reconstruction[..]);
//! assert_eq!(decoded.len(), freq.len());
//! ```

pub mod celt;

// 重导出常用类型
pub use celt::{BandDecoder, BandEncoder, EncodedFrame, Mode, ResidualQuantizer};

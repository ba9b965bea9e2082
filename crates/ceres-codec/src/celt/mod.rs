//! MDCT 频带层.
//!
//! 编码方向: MDCT 系数 → 频带能量 → 归一化 → 立体声旋转 → 基音增益 → 残差量化.
//! 解码方向与之镜像.
//!
//! 熵编码器、脉冲码本、帧内预测和比特分配以 trait 形式接入, 本模块同时提供
//! 一套互相匹配的参考实现, 其比特开销模型是精确上界.

mod bands;
mod entcode;
mod intra;
mod mode;
mod pipeline;
mod pitch;
mod quant;
mod rate;
mod rotation;
mod stereo;
mod vq;

#[cfg(all(feature = "fixed16", feature = "fixed32"))]
compile_error!("feature `fixed16` 与 `fixed32` 不能同时启用");

/// 编译期选定的数值缩放配置
#[cfg(all(feature = "fixed16", not(feature = "fixed32")))]
pub type ActiveScaling = ceres_core::Fixed16Scaling;
/// 编译期选定的数值缩放配置
#[cfg(feature = "fixed32")]
pub type ActiveScaling = ceres_core::Fixed32Scaling;
/// 编译期选定的数值缩放配置
#[cfg(not(any(feature = "fixed16", feature = "fixed32")))]
pub type ActiveScaling = ceres_core::FloatScaling;

pub use bands::{
    compute_band_energies, compute_band_energies_scaled, denormalise_bands,
    denormalise_bands_scaled, normalise_bands, normalise_bands_scaled, renormalise_bands,
    renormalise_bands_scaled,
};
pub use entcode::{EntropyDecoder, EntropyEncoder, RawBitDecoder, RawBitEncoder, ilog};
pub use intra::{FoldingPredictor, INTRA_SIDE_BITS, IntraContext, IntraPredictor};
pub use mode::Mode;
pub use pipeline::{BandDecoder, BandEncoder, EncodedFrame};
pub use pitch::{compute_pitch_gain, compute_pitch_gain_scaled, pitch_quant_bands};
pub use quant::{QuantConfig, ResidualQuantizer};
pub use rate::{BandCost, BitAllocator, CodecCost, LevelAllocator, MAX_PULSES};
pub use rotation::{ROTATION_ITERATIONS, band_theta, exp_rotation};
pub use stereo::{MixDirection, stereo_mix};
pub use vq::{GreedyPulseCodebook, PulseCodebook, pulse_bits};

/// 各处除法与开方的下限, 保证结果有限且为正
pub(crate) const EPSILON: f32 = 1e-10;

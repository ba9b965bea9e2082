//! 基音预测增益.
//!
//! 对每个基音频带估计目标 `X` 与基音预测 `P` 之间的加权相关增益, 再把 (量化后的)
//! 增益乘到 `P` 上. 增益本身的量化和传输由外部完成.

use ceres_core::Scaling;

use super::{ActiveScaling, EPSILON, Mode};

/// 保守系数: 残差过小时脉冲量化效果很差
const PITCH_GAIN_SCALE: f32 = 0.9;

/// 估计每个基音频带的预测增益, 结果位于 `[0, 0.9]`
///
/// 同时把 `p` 在最后一个基音频带之上的部分清零.
pub fn compute_pitch_gain(mode: &Mode, x: &[f32], p: &mut [f32], bank: &[f32]) -> Vec<f32> {
    compute_pitch_gain_scaled::<ActiveScaling>(mode, x, p, bank)
}

/// [`compute_pitch_gain`] 的显式缩放版本
pub fn compute_pitch_gain_scaled<S: Scaling>(
    mode: &Mode,
    x: &[f32],
    p: &mut [f32],
    bank: &[f32],
) -> Vec<f32> {
    mode.assert_spectrum("x", x);
    mode.assert_spectrum("p", p);
    mode.assert_bank(bank);
    let c_count = mode.nb_channels();

    // 高能量频带在相关计算中占更大权重
    let mut w = vec![0.0f32; mode.band_range(mode.nb_ebands() - 1).end];
    for i in 0..mode.nb_ebands() {
        let amp = bank[i * c_count..(i + 1) * c_count]
            .iter()
            .map(|e| e * e)
            .sum::<f32>()
            .sqrt();
        w[mode.band_range(i)].fill(amp * S::ENER_INV);
    }

    let floor = EPSILON * S::NORM * S::NORM;
    let gains = (0..mode.nb_pbands())
        .map(|band| {
            let mut sxy = 0.0f32;
            let mut sxx = 0.0f32;
            for j in mode.pitch_band_range(band) {
                sxy += x[j] * p[j] * w[j];
                sxx += x[j] * x[j] * w[j];
            }
            (sxy / (floor + sxx)).clamp(0.0, 1.0) * PITCH_GAIN_SCALE
        })
        .collect();

    p[mode.pitch_padding_range()].fill(0.0);
    gains
}

/// 将每个基音频带的增益乘到 `p` 上, 并清零最后一个基音频带之上的部分
pub fn pitch_quant_bands(mode: &Mode, p: &mut [f32], gains: &[f32]) {
    mode.assert_spectrum("p", p);
    assert!(
        gains.len() >= mode.nb_pbands(),
        "增益数 {} 少于基音频带数 {}",
        gains.len(),
        mode.nb_pbands()
    );
    for (band, &gain) in gains.iter().enumerate().take(mode.nb_pbands()) {
        for v in &mut p[mode.pitch_band_range(band)] {
            *v *= gain;
        }
    }
    p[mode.pitch_padding_range()].fill(0.0);
}

//! 频带能量、归一化与反归一化.
//!
//! 频带 `i`、声道 `c` 的样本位于 `j·C + c`, 其中 `j ∈ [B·ebands[i], B·ebands[i+1])`.
//! 归一化时额外除以 `sqrt(C)`, 使一个频带在所有声道上的总能量为 1,
//! 后续立体声旋转与残差量化都以这一总能量为单位.

use ceres_core::Scaling;

use super::{ActiveScaling, EPSILON, Mode};

/// 计算每个频带每个声道的幅度 (能量平方根), 结果写入 `bank[i·C + c]`
pub fn compute_band_energies(mode: &Mode, freq: &[f32], bank: &mut [f32]) {
    compute_band_energies_scaled::<ActiveScaling>(mode, freq, bank);
}

/// [`compute_band_energies`] 的显式缩放版本
pub fn compute_band_energies_scaled<S: Scaling>(mode: &Mode, freq: &[f32], bank: &mut [f32]) {
    mode.assert_spectrum("freq", freq);
    mode.assert_bank(bank);
    let c_count = mode.nb_channels();

    for c in 0..c_count {
        for i in 0..mode.nb_ebands() {
            let mut sum = EPSILON;
            for j in mode.band_positions(i) {
                let v = S::SIG_INV * freq[j * c_count + c];
                sum += v * v;
            }
            bank[i * c_count + c] = S::ENER * sum.sqrt();
        }
    }
}

/// 按频带幅度归一化, 得到单位能量的形状 `x`
pub fn normalise_bands(mode: &Mode, freq: &[f32], x: &mut [f32], bank: &[f32]) {
    normalise_bands_scaled::<ActiveScaling>(mode, freq, x, bank);
}

/// [`normalise_bands`] 的显式缩放版本
pub fn normalise_bands_scaled<S: Scaling>(mode: &Mode, freq: &[f32], x: &mut [f32], bank: &[f32]) {
    mode.assert_spectrum("freq", freq);
    mode.assert_spectrum("x", x);
    mode.assert_bank(bank);
    let c_count = mode.nb_channels();
    let sqrt_c = (c_count as f32).sqrt();

    for c in 0..c_count {
        for i in 0..mode.nb_ebands() {
            let g = 1.0 / (EPSILON + S::ENER_INV * bank[i * c_count + c] * sqrt_c);
            for j in mode.band_positions(i) {
                let idx = j * c_count + c;
                x[idx] = S::NORM * S::SIG_INV * freq[idx] * g;
            }
        }
    }
    zero_padding(mode, x);
}

/// 将单位能量的形状乘回频带幅度, 得到信号域频谱
pub fn denormalise_bands(mode: &Mode, x: &[f32], freq: &mut [f32], bank: &[f32]) {
    denormalise_bands_scaled::<ActiveScaling>(mode, x, freq, bank);
}

/// [`denormalise_bands`] 的显式缩放版本
pub fn denormalise_bands_scaled<S: Scaling>(
    mode: &Mode,
    x: &[f32],
    freq: &mut [f32],
    bank: &[f32],
) {
    mode.assert_spectrum("x", x);
    mode.assert_spectrum("freq", freq);
    mode.assert_bank(bank);
    let c_count = mode.nb_channels();
    let sqrt_c = (c_count as f32).sqrt();

    for c in 0..c_count {
        for i in 0..mode.nb_ebands() {
            let g = S::ENER_INV * sqrt_c * bank[i * c_count + c];
            for j in mode.band_positions(i) {
                let idx = j * c_count + c;
                freq[idx] = S::NORM_INV * S::SIG * x[idx] * g;
            }
        }
    }
    zero_padding(mode, freq);
}

/// 就地把每个频带重新缩放到单位能量
///
/// 能量按频带内所有声道联合计算, 因此立体声旋转后 mid/side 之间的能量比例保持不变.
pub fn renormalise_bands(mode: &Mode, x: &mut [f32]) {
    renormalise_bands_scaled::<ActiveScaling>(mode, x);
}

/// [`renormalise_bands`] 的显式缩放版本
pub fn renormalise_bands_scaled<S: Scaling>(mode: &Mode, x: &mut [f32]) {
    mode.assert_spectrum("x", x);
    let nb = mode.nb_ebands();

    let mut energies = vec![0.0f32; nb];
    for (i, e) in energies.iter_mut().enumerate() {
        *e = x[mode.band_range(i)].iter().map(|v| v * v).sum::<f32>();
    }

    for (i, &e) in energies.iter().enumerate() {
        let g = S::NORM / (EPSILON * S::NORM + e.sqrt());
        for v in &mut x[mode.band_range(i)] {
            *v *= g;
        }
    }
    zero_padding(mode, x);
}

/// 将能量频带之上的补零区清零
pub(crate) fn zero_padding(mode: &Mode, buf: &mut [f32]) {
    buf[mode.padding_range()].fill(0.0);
}

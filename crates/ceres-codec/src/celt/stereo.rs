//! 立体声能量加权旋转.
//!
//! 每个频带按左右声道幅度构造旋转 `[[a1, a2], [-a2, a1]]`, 把 `(L, R)` 混合为
//! 能量加权的 `(M, S)`, 反混合使用转置. 0.01 的下限使静音频带不会产生 NaN,
//! 代价是矩阵带有缩放 `(l² + r²) / (0.01 + l² + r²)`: 混合或反混合之后需要
//! [`renormalise_bands`](super::renormalise_bands) 恢复单位能量.

use super::Mode;

/// 混合方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixDirection {
    /// `(L, R) → (M, S)`
    Mix,
    /// `(M, S) → (L, R)`
    Unmix,
}

impl MixDirection {
    fn sign(self) -> f32 {
        match self {
            Self::Mix => 1.0,
            Self::Unmix => -1.0,
        }
    }
}

/// 就地对交织频谱执行立体声混合或反混合, 单声道模式下不做任何处理
pub fn stereo_mix(mode: &Mode, x: &mut [f32], bank: &[f32], dir: MixDirection) {
    if mode.nb_channels() != 2 {
        return;
    }
    mode.assert_spectrum("x", x);
    mode.assert_bank(bank);

    for i in 0..mode.nb_ebands() {
        let left = bank[i * 2];
        let right = bank[i * 2 + 1];
        let norm = (0.01 + left * left + right * right).sqrt();
        let a1 = left / norm;
        let a2 = dir.sign() * right / norm;

        for j in mode.band_positions(i) {
            let l = x[j * 2];
            let r = x[j * 2 + 1];
            x[j * 2] = a1 * l + a2 * r;
            x[j * 2 + 1] = a1 * r - a2 * l;
        }
    }
    super::bands::zero_padding(mode, x);
}

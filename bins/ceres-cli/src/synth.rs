//! MDCT 域测试信号合成.
//!
//! 谐波音: 基频 `fundamental` (单位: 频点) 及其谐波, 幅度按 1/h 衰减,
//! 相位随帧号缓慢变化, 再叠加确定性的伪随机噪声. 结果只依赖帧号,
//! 因此各帧可以独立并行生成.

use ceres_codec::Mode;

#[derive(Debug, Clone, Copy)]
pub struct ToneSource {
    /// 基频所在频点
    pub fundamental: f32,
    /// 噪声幅度 (相对于基频幅度)
    pub noise: f32,
    /// 右声道相对左声道的增益
    pub balance: f32,
}

impl ToneSource {
    /// 第 `index` 帧的交织频谱, 长度为 `mode.spectrum_len()`
    pub fn frame(&self, mode: &Mode, index: usize) -> Vec<f32> {
        let blocks = mode.nb_mdct_blocks();
        let channels = mode.nb_channels();
        let end = blocks * mode.ebands()[mode.nb_ebands()];
        let phase = index as f32 * 0.3;

        let mut freq = vec![0.0f32; mode.spectrum_len()];
        for j in 0..end {
            let bin = (j / blocks) as f32 + 0.5;
            let block = (j % blocks) as f32;
            let mut v = 0.0f32;
            let mut h = 1.0f32;
            while h * self.fundamental <= bin + 2.0 {
                let d = bin - h * self.fundamental;
                // 每个谐波在相邻频点上的泄漏
                v += (-d * d).exp() / h * (phase * h + block).cos();
                h += 1.0;
            }
            for c in 0..channels {
                let gain = if c == 0 { 1.0 } else { self.balance };
                let n = self.noise * noise(index, j, c);
                freq[j * channels + c] = gain * v + n;
            }
        }
        freq
    }
}

/// `[-1, 1)` 内的确定性噪声
fn noise(index: usize, j: usize, c: usize) -> f32 {
    let mut s = (index as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(((j as u64) << 1) | c as u64);
    s ^= s >> 33;
    s = s.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    s ^= s >> 33;
    (s >> 40) as f32 / (1u64 << 23) as f32 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_deterministic_and_padded() {
        let mode = Mode::standard(2, 2).unwrap();
        let src = ToneSource {
            fundamental: 5.0,
            noise: 0.01,
            balance: 0.5,
        };
        let a = src.frame(&mode, 3);
        let b = src.frame(&mode, 3);
        assert_eq!(a, b);
        assert_ne!(a, src.frame(&mode, 4));
        assert_eq!(a.len(), mode.spectrum_len());
        assert!(a[mode.padding_range()].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_noise_range() {
        for i in 0..100 {
            let v = noise(i, i * 7, i % 2);
            assert!((-1.0..1.0).contains(&v));
        }
    }
}

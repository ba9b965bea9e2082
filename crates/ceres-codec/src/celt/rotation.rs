//! 扩频旋转.
//!
//! 稀疏的脉冲码本会在频带内留下孤立的谱线, 听起来带有音调噪声.
//! 在量化前后对目标和预测施加一串二维旋转, 使每个样本的能量按双边指数
//! 包络扩散到邻近样本, 码本因而在扩散域中工作.

/// 每次旋转的迭代次数
pub const ROTATION_ITERATIONS: usize = 8;

/// 频带旋转角度的比例系数
pub(crate) const THETA_SCALE: f32 = 0.007;

/// 频带旋转角度: 频带越宽、脉冲越少, 旋转越多
///
/// `len` 为频带在交织缓冲区中的长度, `pulses` 为分配给该频带的脉冲数.
pub fn band_theta(len: usize, pulses: i32) -> f32 {
    band_theta_with_scale(THETA_SCALE, len, pulses)
}

pub(crate) fn band_theta_with_scale(scale: f32, len: usize, pulses: i32) -> f32 {
    scale * len as f32 / (0.1 + pulses as f32)
}

/// 就地对 `x` 施加扩频旋转
///
/// 每次迭代先正向 (`i` 递增) 再反向 (`i` 递减) 旋转 `(x[i], x[i+stride])` 对,
/// `dir` 取 `+1` 或 `-1`. 整个旋转序列是回文的, 因此以 `-dir` 再做一次即可精确还原.
pub fn exp_rotation(x: &mut [f32], theta: f32, dir: i32, stride: usize, iter: usize) {
    let len = x.len();
    if stride == 0 || len <= stride {
        return;
    }
    let c = theta.cos();
    let s = dir as f32 * theta.sin();

    for _ in 0..iter {
        for i in 0..len - stride {
            rotate_pair(x, i, stride, c, s);
        }
        if len > 2 * stride {
            for i in (0..len - 2 * stride).rev() {
                rotate_pair(x, i, stride, c, s);
            }
        }
    }
}

#[inline]
fn rotate_pair(x: &mut [f32], i: usize, stride: usize, c: f32, s: f32) {
    let x1 = x[i];
    let x2 = x[i + stride];
    x[i] = c * x1 - s * x2;
    x[i + stride] = c * x2 + s * x1;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 按相反的顺序逐个撤销旋转, 作为逆变换的参考实现
    fn reference_inverse(x: &mut [f32], theta: f32, dir: i32, stride: usize, iter: usize) {
        let len = x.len();
        if stride == 0 || len <= stride {
            return;
        }
        let c = theta.cos();
        let s = -(dir as f32) * theta.sin();
        for _ in 0..iter {
            if len > 2 * stride {
                for i in 0..len - 2 * stride {
                    rotate_pair(x, i, stride, c, s);
                }
            }
            for i in (0..len - stride).rev() {
                rotate_pair(x, i, stride, c, s);
            }
        }
    }

    fn sample_vector(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| ((i * 29 % 17) as f32 - 8.0) / 8.0)
            .collect()
    }

    #[test]
    fn test_reference_inverse_restores_input() {
        for (stride, theta) in [(1, 0.3f32), (2, 0.1), (3, 0.5), (4, 0.05)] {
            let orig = sample_vector(16);
            let mut x = orig.clone();
            exp_rotation(&mut x, theta, 1, stride, ROTATION_ITERATIONS);
            reference_inverse(&mut x, theta, 1, stride, ROTATION_ITERATIONS);
            for (a, b) in x.iter().zip(orig.iter()) {
                assert!((a - b).abs() < 1e-5, "stride={} theta={}", stride, theta);
            }
        }
    }

    #[test]
    fn test_opposite_direction_restores_input() {
        let orig = sample_vector(24);
        let mut x = orig.clone();
        exp_rotation(&mut x, 0.2, 1, 2, ROTATION_ITERATIONS);
        assert!(x.iter().zip(orig.iter()).any(|(a, b)| (a - b).abs() > 1e-3));
        exp_rotation(&mut x, 0.2, -1, 2, ROTATION_ITERATIONS);
        for (a, b) in x.iter().zip(orig.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rotation_preserves_energy() {
        let mut x = sample_vector(32);
        let before: f32 = x.iter().map(|v| v * v).sum();
        exp_rotation(&mut x, 0.4, -1, 3, ROTATION_ITERATIONS);
        let after: f32 = x.iter().map(|v| v * v).sum();
        assert!((before - after).abs() < 1e-4 * before);
    }

    #[test]
    fn test_impulse_spreads_with_unimodal_envelope() {
        let mut x = vec![0.0f32; 16];
        x[0] = 1.0;
        exp_rotation(&mut x, 0.1, 1, 2, ROTATION_ITERATIONS);

        // 奇数位置属于另一个交织块, 不受影响
        assert!(x.iter().skip(1).step_by(2).all(|&v| v == 0.0));

        let even: Vec<f32> = x.iter().step_by(2).map(|v| v.abs()).collect();
        let peak = even
            .iter()
            .enumerate()
            .fold(0, |best, (i, &v)| if v > even[best] { i } else { best });
        assert!(even[..=peak].windows(2).all(|w| w[0] <= w[1]));
        assert!(even[peak..].windows(2).all(|w| w[0] > w[1]));
        assert!(even[even.len() - 1] < 0.01);
    }

    #[test]
    fn test_short_slices_untouched() {
        let mut x = [1.0f32, 2.0];
        exp_rotation(&mut x, 0.3, 1, 2, ROTATION_ITERATIONS);
        assert_eq!(x, [1.0, 2.0]);

        let mut y = [1.0f32, 0.0, 0.0];
        exp_rotation(&mut y, 0.0, 1, 1, ROTATION_ITERATIONS);
        assert_eq!(y, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_theta_shrinks_with_pulses() {
        assert!(band_theta(16, 1) > band_theta(16, 4));
        assert!(band_theta(32, 2) > band_theta(16, 2));
        assert!((band_theta(10, 0) - 0.7).abs() < 1e-6);
    }
}

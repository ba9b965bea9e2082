//! 脉冲码本 (代数矢量量化).
//!
//! [`PulseCodebook`] 把一个频带的形状量化为 `k` 个单位脉冲, 并把重建结果写回 `x`.
//! 参考实现 [`GreedyPulseCodebook`] 采用贪心脉冲搜索, 码字直接传输脉冲位置和符号:
//!
//! - 每个脉冲的位置: `encode_uint(pos, n)`, 按位置递增
//! - 每个非零位置一个符号位 (1 表示负)
//!
//! 重建为 `x = p + g·y`, 其中 `g` 使 `‖x‖` 等于单位范数.

use ceres_core::{CeresResult, Scaling};

use super::entcode::{EntropyDecoder, EntropyEncoder, ilog};
use super::{ActiveScaling, EPSILON};

/// 脉冲码本
pub trait PulseCodebook {
    /// 量化 `x` 并写入码字, `x` 被替换为实际写出的重建值
    ///
    /// `w` 为感知权重, `p` 为预测, `alpha` 为搜索前从目标中扣除的预测比例.
    fn quant<E: EntropyEncoder>(
        &self,
        x: &mut [f32],
        w: &[f32],
        k: usize,
        p: &[f32],
        alpha: f32,
        enc: &mut E,
    ) -> CeresResult<()>;

    /// 读取码字并把重建值写入 `x`
    fn unquant<D: EntropyDecoder>(
        &self,
        x: &mut [f32],
        k: usize,
        p: &[f32],
        alpha: f32,
        dec: &mut D,
    ) -> CeresResult<()>;

    /// 长度 `n`、`k` 个脉冲的码字开销上界 (比特)
    fn pulse_bits(&self, n: usize, k: usize) -> u32;
}

/// 参考码本的码字开销: `k·ilog(n-1) + min(k, n)`
pub fn pulse_bits(n: usize, k: usize) -> u32 {
    if n == 0 || k == 0 {
        return 0;
    }
    k as u32 * ilog(n as u32 - 1) + k.min(n) as u32
}

/// 贪心搜索的参考码本
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyPulseCodebook;

impl PulseCodebook for GreedyPulseCodebook {
    fn quant<E: EntropyEncoder>(
        &self,
        x: &mut [f32],
        w: &[f32],
        k: usize,
        p: &[f32],
        alpha: f32,
        enc: &mut E,
    ) -> CeresResult<()> {
        let n = x.len();
        debug_assert!(k > 0 && n > 0);
        debug_assert!(w.len() >= n && p.len() >= n);

        let target: Vec<f32> = (0..n).map(|j| w[j] * (x[j] - alpha * p[j])).collect();
        let pulses = pvq_search(&target, k);
        encode_pulses(&pulses, enc);
        reconstruct(x, p, &pulses);
        Ok(())
    }

    fn unquant<D: EntropyDecoder>(
        &self,
        x: &mut [f32],
        k: usize,
        p: &[f32],
        _alpha: f32,
        dec: &mut D,
    ) -> CeresResult<()> {
        let pulses = decode_pulses(x.len(), k, dec)?;
        reconstruct(x, p, &pulses);
        Ok(())
    }

    fn pulse_bits(&self, n: usize, k: usize) -> u32 {
        pulse_bits(n, k)
    }
}

/// 在 `target` 方向上放置 `k` 个脉冲, 最大化 `Rxy / sqrt(Ryy)`
fn pvq_search(target: &[f32], k: usize) -> Vec<i32> {
    let n = target.len();
    let abs: Vec<f32> = target.iter().map(|v| v.abs()).collect();
    let mut pulses = vec![0i32; n];
    let mut xy = 0.0f32;
    let mut yy = 0.0f32;
    let mut left = k as i32;

    // 脉冲较多时先按比例投影, 剩余的再贪心放置
    if k > n / 2 {
        let sum: f32 = abs.iter().sum();
        if sum > EPSILON {
            let rcp = (k as f32 + 0.8) / sum;
            for (pulse, &a) in pulses.iter_mut().zip(&abs) {
                let q = ((rcp * a).floor() as i32).min(left);
                *pulse = q;
                left -= q;
                yy += (q * q) as f32;
                xy += a * q as f32;
            }
        }
    }

    for _ in 0..left {
        let mut best = 0usize;
        let mut best_num = -1.0f32;
        let mut best_den = 1.0f32;
        for (j, &a) in abs.iter().enumerate() {
            let rxy = xy + a;
            let ryy = yy + (2 * pulses[j] + 1) as f32;
            let num = rxy * rxy;
            if num * best_den > best_num * ryy {
                best = j;
                best_num = num;
                best_den = ryy;
            }
        }
        xy += abs[best];
        yy += (2 * pulses[best] + 1) as f32;
        pulses[best] += 1;
    }

    for (pulse, &t) in pulses.iter_mut().zip(target) {
        if t < 0.0 {
            *pulse = -*pulse;
        }
    }
    pulses
}

fn encode_pulses<E: EntropyEncoder>(pulses: &[i32], enc: &mut E) {
    let n = pulses.len() as u32;
    for (pos, &pulse) in pulses.iter().enumerate() {
        for _ in 0..pulse.unsigned_abs() {
            enc.encode_uint(pos as u32, n);
        }
    }
    for &pulse in pulses.iter().filter(|&&v| v != 0) {
        enc.encode_bits(u32::from(pulse < 0), 1);
    }
}

fn decode_pulses<D: EntropyDecoder>(n: usize, k: usize, dec: &mut D) -> CeresResult<Vec<i32>> {
    let mut pulses = vec![0i32; n];
    for _ in 0..k {
        let pos = dec.decode_uint(n as u32)? as usize;
        pulses[pos] += 1;
    }
    for pulse in pulses.iter_mut().filter(|v| **v != 0) {
        if dec.decode_bits(1)? == 1 {
            *pulse = -*pulse;
        }
    }
    Ok(pulses)
}

/// `x = p + g·y`, `g` 取使 `‖x‖² = NORM²` 的正根
fn reconstruct(x: &mut [f32], p: &[f32], pulses: &[i32]) {
    let unit = ActiveScaling::NORM * ActiveScaling::NORM;
    let mut ryy = 0.0f32;
    let mut ryp = 0.0f32;
    let mut rpp = 0.0f32;
    for (&y, &pj) in pulses.iter().zip(p) {
        let y = y as f32;
        ryy += y * y;
        ryp += y * pj;
        rpp += pj * pj;
    }
    if ryy <= 0.0 {
        x.copy_from_slice(&p[..x.len()]);
        return;
    }
    let disc = (ryp * ryp + ryy * (unit - rpp)).max(0.0);
    let g = (disc.sqrt() - ryp) / ryy;
    for ((xj, &y), &pj) in x.iter_mut().zip(pulses).zip(p) {
        *xj = pj + g * y as f32;
    }
}

//! 比特分配.
//!
//! 把残差量化剩余的比特预算换算成每个频带的脉冲数. `pulses[i] <= 0` 表示该频带
//! 不做脉冲量化, 由帧内预测接管. 频带开销由 [`BandCost`] 给出, 量化器用自己的
//! 脉冲码本和帧内预测器构造 [`CodecCost`], 分配结果因此对任意协作者都不超预算.

use log::trace;

use super::Mode;
use super::intra::IntraPredictor;
use super::vq::PulseCodebook;

/// 单个频带的最大脉冲数
pub const MAX_PULSES: i32 = 128;

/// 全局分配等级的上限
const MAX_LEVEL: i32 = 512;

/// 频带开销模型
pub trait BandCost {
    /// 频带 `band` 分到 `q` 个脉冲时写入码流的比特数上界
    fn band_cost(&self, mode: &Mode, band: usize, q: i32) -> i32;
}

/// 由脉冲码本和帧内预测器组合出的开销模型
///
/// 与量化器的频带流程一一对应: `q <= 0` 的频带折叠, 不写任何比特; 截止点之上的
/// 频带先写帧内预测边信息, 再用 `q - 1` 个脉冲量化残差.
#[derive(Debug, Clone, Copy)]
pub struct CodecCost<'a, V, I> {
    pub codebook: &'a V,
    pub predictor: &'a I,
}

impl<'a, V: PulseCodebook, I: IntraPredictor> CodecCost<'a, V, I> {
    pub fn new(codebook: &'a V, predictor: &'a I) -> Self {
        Self {
            codebook,
            predictor,
        }
    }
}

impl<V: PulseCodebook, I: IntraPredictor> BandCost for CodecCost<'_, V, I> {
    fn band_cost(&self, mode: &Mode, band: usize, q: i32) -> i32 {
        if q <= 0 {
            return 0;
        }
        let n = mode.block_stride() * mode.band_width(band);
        let bits = if mode.is_above_pitch_end(band) {
            self.predictor.side_bits() + self.codebook.pulse_bits(n, (q - 1) as usize)
        } else {
            self.codebook.pulse_bits(n, q as usize)
        };
        bits as i32
    }
}

/// 比特分配器
pub trait BitAllocator {
    /// 按 `bits` 预算为每个频带计算脉冲数, 写入 `pulses[..nb_ebands]`
    ///
    /// 按 `cost` 计算的总开销 (含分配器自身的簿记) 不得超过 `bits`;
    /// 预算非正时全部为 0.
    fn compute_allocation<C: BandCost>(
        &self,
        mode: &Mode,
        offsets: &[i32],
        bits: i32,
        cost: &C,
        pulses: &mut [i32],
    );
}

/// 按全局等级二分的参考分配器
///
/// 频带 `i` 在等级 `L` 下得到 `max(0, L·n_i/64 + offsets[i])` 个脉冲 (`n_i` 为频带长度,
/// 上限 [`MAX_PULSES`]). 取开销不超出预算的最大等级, 剩余比特再按频带升序逐个补脉冲.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelAllocator;

impl LevelAllocator {
    fn level_pulses<C: BandCost>(
        mode: &Mode,
        offsets: &[i32],
        level: i32,
        cost: &C,
        pulses: &mut [i32],
    ) -> i32 {
        let mut total = 0;
        for (band, pulse) in pulses.iter_mut().enumerate().take(mode.nb_ebands()) {
            let n = mode.band_range(band).len() as i32;
            let offset = offsets.get(band).copied().unwrap_or(0);
            *pulse = (level * n / 64 + offset).clamp(0, MAX_PULSES);
            total += cost.band_cost(mode, band, *pulse);
        }
        total
    }
}

impl BitAllocator for LevelAllocator {
    fn compute_allocation<C: BandCost>(
        &self,
        mode: &Mode,
        offsets: &[i32],
        bits: i32,
        cost: &C,
        pulses: &mut [i32],
    ) {
        let nb = mode.nb_ebands();
        assert!(pulses.len() >= nb, "pulses 长度 {} 小于频带数 {}", pulses.len(), nb);
        pulses[..nb].fill(0);
        if bits <= 0 {
            return;
        }

        // 开销随等级单调不减, 二分找出最大可行等级
        let mut lo = 0;
        let mut hi = MAX_LEVEL;
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            if Self::level_pulses(mode, offsets, mid, cost, pulses) <= bits {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        let mut used = Self::level_pulses(mode, offsets, lo, cost, pulses);
        if used > bits {
            // 正偏移使等级 0 也超出预算
            pulses[..nb].fill(0);
            used = 0;
        }

        loop {
            let mut grew = false;
            for band in 0..nb {
                let q = pulses[band];
                if q >= MAX_PULSES {
                    continue;
                }
                let delta = cost.band_cost(mode, band, q + 1) - cost.band_cost(mode, band, q);
                if used + delta <= bits {
                    pulses[band] = q + 1;
                    used += delta;
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        trace!("分配等级 {}: {}/{} 比特, 脉冲 {:?}", lo, used, bits, &pulses[..nb]);
    }
}

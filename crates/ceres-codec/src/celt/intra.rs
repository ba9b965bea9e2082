//! 帧内预测.
//!
//! 没有基音预测可用的频带 (位于 `pitch_end` 之上, 或分配不到脉冲) 从本帧
//! 已经编码的低频部分构造预测 `P`:
//!
//! - **fold**: 不传任何边信息, 直接把已编码频谱折叠到当前频带
//! - **predict / unquant**: 在当前频带之下搜索最多 32 个延迟, 传输延迟和符号,
//!   按脉冲数缩放预测

use ceres_core::{CeresResult, Scaling};

use super::entcode::{EntropyDecoder, EntropyEncoder};
use super::{ActiveScaling, EPSILON};

/// 参考预测器每个频带写入的边信息上界 (比特): 5 位延迟 + 1 位符号
pub const INTRA_SIDE_BITS: u32 = 6;

/// 延迟搜索的最大候选数
const MAX_INTRA_LAGS: usize = 32;

/// 帧内预测的上下文
#[derive(Debug, Clone, Copy)]
pub struct IntraContext<'a> {
    /// 已重建并按频带长度缩放的频谱, 覆盖 `[0, stride·n0)`
    pub norm: &'a [f32],
    /// 交织周期 `B·C`
    pub stride: usize,
    /// 当前频带的起始频点
    pub n0: usize,
    /// 补零后的频谱末端频点
    pub nmax: usize,
}

/// 帧内预测器
pub trait IntraPredictor {
    /// 不带边信息的折叠预测, 同时令 `x = p`
    fn fold(&self, x: &mut [f32], ctx: &IntraContext<'_>, p: &mut [f32]);

    /// 搜索预测并写入边信息, `w` 为搜索时的感知权重
    ///
    /// `k > 0` 时从 `x` 中减去预测, 残差随后交给脉冲码本; `k == 0` 时 `x` 直接取预测.
    fn predict<E: EntropyEncoder>(
        &self,
        x: &mut [f32],
        w: &[f32],
        k: usize,
        ctx: &IntraContext<'_>,
        p: &mut [f32],
        enc: &mut E,
    ) -> CeresResult<()>;

    /// 读取边信息并重建预测, `k == 0` 时同时写入 `x`
    fn unquant<D: EntropyDecoder>(
        &self,
        x: &mut [f32],
        k: usize,
        ctx: &IntraContext<'_>,
        p: &mut [f32],
        dec: &mut D,
    ) -> CeresResult<()>;

    /// 每个频带边信息的开销上界
    fn side_bits(&self) -> u32;
}

/// 折叠 + 延迟搜索的参考预测器
#[derive(Debug, Clone, Copy, Default)]
pub struct FoldingPredictor;

impl FoldingPredictor {
    /// 可用的延迟候选数, 上下文不足一个频带宽度时为 0
    fn lag_count(ctx: &IntraContext<'_>, len: usize) -> usize {
        let width = len / ctx.stride.max(1);
        if ctx.n0 < width {
            0
        } else {
            (ctx.n0 - width + 1).min(MAX_INTRA_LAGS)
        }
    }

    /// 延迟 `lag` 对应的候选向量: 紧贴当前频带之下、再向下偏移 `lag` 个频点
    fn candidate<'a>(ctx: &IntraContext<'a>, len: usize, lag: usize) -> &'a [f32] {
        let width = len / ctx.stride;
        let start = (ctx.n0 - width - lag) * ctx.stride;
        &ctx.norm[start..start + len]
    }

    /// 按感知权重计算相关, 取 `(Σw·x·y)² / (0.1·NORM² + Σy²)` 最大的延迟
    fn search(x: &[f32], w: &[f32], ctx: &IntraContext<'_>, max_pos: usize) -> (usize, bool) {
        let floor = 0.1 * ActiveScaling::NORM * ActiveScaling::NORM;
        let mut best = 0;
        let mut best_score = 0.0f32;
        let mut negative = false;
        for lag in 0..max_pos {
            let cand = Self::candidate(ctx, x.len(), lag);
            let mut xy = 0.0f32;
            let mut yy = 0.0f32;
            for ((&a, &g), &b) in x.iter().zip(w).zip(cand) {
                xy += g * a * b;
                yy += b * b;
            }
            let score = xy * xy / (floor + yy);
            if score > best_score {
                best_score = score;
                best = lag;
                negative = xy < 0.0;
            }
        }
        (best, negative)
    }

    /// 把 `p` 缩放到范数 `gain·NORM`, 静音时退化为平坦向量
    fn scale_to(p: &mut [f32], gain: f32) {
        let energy: f32 = p.iter().map(|v| v * v).sum();
        if energy <= EPSILON * ActiveScaling::NORM * ActiveScaling::NORM {
            p.fill(gain * ActiveScaling::NORM / (p.len() as f32).sqrt());
        } else {
            let g = gain * ActiveScaling::NORM / energy.sqrt();
            p.iter_mut().for_each(|v| *v *= g);
        }
    }

    /// 把已编码频谱折叠进 `p` (未归一化)
    fn fold_into(ctx: &IntraContext<'_>, p: &mut [f32]) {
        let stride = ctx.stride;
        let avail = stride * ctx.n0;
        if 2 * ctx.n0 >= ctx.nmax {
            // 从上端镜像
            let width = p.len() / stride;
            for j in 0..width {
                let src = ctx.nmax - ctx.n0 - j - 1;
                p[j * stride..(j + 1) * stride]
                    .copy_from_slice(&ctx.norm[src * stride..(src + 1) * stride]);
            }
        } else {
            for (j, v) in p.iter_mut().enumerate() {
                *v = if j < avail { ctx.norm[j] } else { 0.0 };
            }
        }
    }

    fn apply(x: &mut [f32], p: &mut [f32], k: usize) {
        if k > 0 {
            Self::scale_to(p, pred_gain(k));
            x.iter_mut().zip(p.iter()).for_each(|(a, b)| *a -= b);
        } else {
            Self::scale_to(p, 1.0);
            x.copy_from_slice(p);
        }
    }
}

/// 预测增益: 脉冲越多, 预测越保守
fn pred_gain(k: usize) -> f32 {
    if k > 10 { 0.5 } else { 0.9 - 0.04 * k as f32 }
}

impl IntraPredictor for FoldingPredictor {
    fn fold(&self, x: &mut [f32], ctx: &IntraContext<'_>, p: &mut [f32]) {
        Self::fold_into(ctx, p);
        Self::scale_to(p, 1.0);
        x.copy_from_slice(p);
    }

    fn predict<E: EntropyEncoder>(
        &self,
        x: &mut [f32],
        w: &[f32],
        k: usize,
        ctx: &IntraContext<'_>,
        p: &mut [f32],
        enc: &mut E,
    ) -> CeresResult<()> {
        debug_assert!(w.len() >= x.len());
        let max_pos = Self::lag_count(ctx, x.len());
        if max_pos == 0 {
            Self::fold_into(ctx, p);
        } else {
            let (lag, negative) = Self::search(x, w, ctx, max_pos);
            enc.encode_uint(lag as u32, max_pos as u32);
            enc.encode_bits(u32::from(negative), 1);
            let sign = if negative { -1.0 } else { 1.0 };
            for (dst, &src) in p.iter_mut().zip(Self::candidate(ctx, x.len(), lag)) {
                *dst = sign * src;
            }
        }
        Self::apply(x, p, k);
        Ok(())
    }

    fn unquant<D: EntropyDecoder>(
        &self,
        x: &mut [f32],
        k: usize,
        ctx: &IntraContext<'_>,
        p: &mut [f32],
        dec: &mut D,
    ) -> CeresResult<()> {
        let max_pos = Self::lag_count(ctx, x.len());
        if max_pos == 0 {
            Self::fold_into(ctx, p);
        } else {
            let lag = dec.decode_uint(max_pos as u32)? as usize;
            let sign = if dec.decode_bits(1)? == 1 { -1.0 } else { 1.0 };
            for (dst, &src) in p.iter_mut().zip(Self::candidate(ctx, x.len(), lag)) {
                *dst = sign * src;
            }
        }
        // k > 0 时 x 由脉冲码本整体覆盖, 无需减去预测
        if k > 0 {
            Self::scale_to(p, pred_gain(k));
        } else {
            Self::scale_to(p, 1.0);
            x.copy_from_slice(p);
        }
        Ok(())
    }

    fn side_bits(&self) -> u32 {
        INTRA_SIDE_BITS
    }
}

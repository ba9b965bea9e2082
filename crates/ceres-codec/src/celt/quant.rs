//! 残差量化与反量化.
//!
//! 每帧按剩余比特预算分配各频带的脉冲数, 然后按频带升序逐个处理:
//! 基音预测不可用时切换到帧内预测, 有脉冲时在扩频旋转域中做脉冲量化,
//! 最后把重建结果缩放后写入 `norm`, 作为后续频带帧内预测的上下文.
//!
//! 编码端与解码端执行完全相同的重建运算, 因此两端得到的 `X` 逐位一致.

use ceres_core::{CeresError, CeresResult};
use log::{debug, trace};

use super::entcode::{EntropyDecoder, EntropyEncoder};
use super::intra::{FoldingPredictor, IntraContext, IntraPredictor};
use super::rate::{BitAllocator, CodecCost, LevelAllocator};
use super::rotation::{ROTATION_ITERATIONS, THETA_SCALE, band_theta_with_scale, exp_rotation};
use super::vq::{GreedyPulseCodebook, PulseCodebook};
use super::Mode;

/// 残差量化参数
#[derive(Debug, Clone, PartialEq)]
pub struct QuantConfig {
    /// 基音可用频带中, 搜索前从目标里扣除的预测比例
    pub inter_alpha: f32,
    /// 扩频旋转迭代次数
    pub rotation_iterations: usize,
    /// 旋转角度比例系数
    pub rotation_scale: f32,
    /// 预留的安全比特
    pub safety_margin_bits: i32,
}

impl Default for QuantConfig {
    fn default() -> Self {
        Self {
            inter_alpha: 0.7,
            rotation_iterations: ROTATION_ITERATIONS,
            rotation_scale: THETA_SCALE,
            safety_margin_bits: 1,
        }
    }
}

/// 频带残差量化器
///
/// 持有比特分配器、脉冲码本和帧内预测器, 以及在帧之间复用的临时缓冲区.
#[derive(Debug, Clone)]
pub struct ResidualQuantizer<
    A = LevelAllocator,
    V = GreedyPulseCodebook,
    I = FoldingPredictor,
> {
    allocator: A,
    codebook: V,
    predictor: I,
    config: QuantConfig,
    norm: Vec<f32>,
    pulses: Vec<i32>,
    offsets: Vec<i32>,
}

impl ResidualQuantizer {
    /// 使用参考协作者创建
    pub fn reference(config: QuantConfig) -> Self {
        Self::new(LevelAllocator, GreedyPulseCodebook, FoldingPredictor, config)
    }
}

impl Default for ResidualQuantizer {
    fn default() -> Self {
        Self::reference(QuantConfig::default())
    }
}

/// 一个频带的处理参数
struct BandPlan {
    pulses: i32,
    theta: f32,
    scale: f32,
    intra: bool,
}

impl<A: BitAllocator, V: PulseCodebook, I: IntraPredictor> ResidualQuantizer<A, V, I> {
    pub fn new(allocator: A, codebook: V, predictor: I, config: QuantConfig) -> Self {
        Self {
            allocator,
            codebook,
            predictor,
            config,
            norm: Vec::new(),
            pulses: Vec::new(),
            offsets: Vec::new(),
        }
    }

    /// 量化归一化频谱 `x`, 完成后 `x` 为编码端的重建值
    ///
    /// `p` 为 (已乘增益的) 基音预测, 会在旋转时被就地修改; `w` 为感知权重.
    pub fn quant_bands<E: EntropyEncoder>(
        &mut self,
        mode: &Mode,
        x: &mut [f32],
        p: &mut [f32],
        w: &[f32],
        total_bits: i32,
        enc: &mut E,
    ) -> CeresResult<()> {
        check_len(mode, "x", x)?;
        check_len(mode, "p", p)?;
        check_len(mode, "w", w)?;
        self.allocate(mode, total_bits, enc.tell());

        let stride = mode.block_stride();
        let iters = self.config.rotation_iterations;
        for band in 0..mode.nb_ebands() {
            let range = mode.band_range(band);
            let plan = self.plan(mode, band);
            let mut q = plan.pulses;
            let mut alpha = self.config.inter_alpha;

            if plan.intra {
                alpha = 0.0;
                q -= 1;
                let ctx = self.context(mode, band);
                let (xb, pb) = (&mut x[range.clone()], &mut p[range.clone()]);
                if q < 0 {
                    self.predictor.fold(xb, &ctx, pb);
                } else {
                    self.predictor
                        .predict(xb, &w[range.clone()], q as usize, &ctx, pb, enc)?;
                }
            }

            if q > 0 {
                exp_rotation(&mut p[range.clone()], plan.theta, -1, stride, iters);
                exp_rotation(&mut x[range.clone()], plan.theta, -1, stride, iters);
                self.codebook.quant(
                    &mut x[range.clone()],
                    &w[range.clone()],
                    q as usize,
                    &p[range.clone()],
                    alpha,
                    enc,
                )?;
                exp_rotation(&mut x[range.clone()], plan.theta, 1, stride, iters);
            }

            self.store_context(&x[range.clone()], range.start, plan.scale);
            trace!(
                "频带 {}: q={} intra={} alpha={} tell={}",
                band,
                plan.pulses,
                plan.intra,
                alpha,
                enc.tell()
            );
        }

        x[mode.padding_range()].fill(0.0);
        debug_assert!(
            enc.tell() <= total_bits,
            "残差量化超出比特预算: {} > {}",
            enc.tell(),
            total_bits
        );
        Ok(())
    }

    /// 从码流重建归一化频谱 `x`
    pub fn unquant_bands<D: EntropyDecoder>(
        &mut self,
        mode: &Mode,
        x: &mut [f32],
        p: &mut [f32],
        total_bits: i32,
        dec: &mut D,
    ) -> CeresResult<()> {
        check_len(mode, "x", x)?;
        check_len(mode, "p", p)?;
        self.allocate(mode, total_bits, dec.tell());

        let stride = mode.block_stride();
        let iters = self.config.rotation_iterations;
        for band in 0..mode.nb_ebands() {
            let range = mode.band_range(band);
            let plan = self.plan(mode, band);
            let mut q = plan.pulses;
            let mut alpha = self.config.inter_alpha;

            if plan.intra {
                alpha = 0.0;
                q -= 1;
                let ctx = self.context(mode, band);
                let (xb, pb) = (&mut x[range.clone()], &mut p[range.clone()]);
                if q < 0 {
                    self.predictor.fold(xb, &ctx, pb);
                } else {
                    self.predictor.unquant(xb, q as usize, &ctx, pb, dec)?;
                }
            }

            if q > 0 {
                exp_rotation(&mut p[range.clone()], plan.theta, -1, stride, iters);
                self.codebook.unquant(
                    &mut x[range.clone()],
                    q as usize,
                    &p[range.clone()],
                    alpha,
                    dec,
                )?;
                exp_rotation(&mut x[range.clone()], plan.theta, 1, stride, iters);
            }

            self.store_context(&x[range.clone()], range.start, plan.scale);
            trace!("频带 {}: q={} intra={} tell={}", band, plan.pulses, plan.intra, dec.tell());
        }

        x[mode.padding_range()].fill(0.0);
        Ok(())
    }

    /// 重置临时缓冲区并计算本帧的脉冲分配
    fn allocate(&mut self, mode: &Mode, total_bits: i32, tell: i32) {
        let nb = mode.nb_ebands();
        self.norm.clear();
        self.norm.resize(mode.spectrum_len(), 0.0);
        self.pulses.clear();
        self.pulses.resize(nb, 0);
        self.offsets.clear();
        self.offsets.resize(nb, 0);

        let bits = total_bits - tell - self.config.safety_margin_bits;
        let cost = CodecCost::new(&self.codebook, &self.predictor);
        self.allocator
            .compute_allocation(mode, &self.offsets, bits, &cost, &mut self.pulses);
        debug!(
            "残差预算 {} 比特 (总计 {}, 已用 {}), 分配 {:?}",
            bits, total_bits, tell, self.pulses
        );
    }

    fn plan(&self, mode: &Mode, band: usize) -> BandPlan {
        let len = mode.block_stride() * mode.band_width(band);
        let pulses = self.pulses[band];
        BandPlan {
            pulses,
            // 0.0625 防止定点实现中溢出, 对浮点无影响
            scale: 0.0625 * (len as f32).sqrt(),
            theta: band_theta_with_scale(self.config.rotation_scale, len, pulses),
            intra: mode.is_above_pitch_end(band) || pulses <= 0,
        }
    }

    fn context(&self, mode: &Mode, band: usize) -> IntraContext<'_> {
        let n0 = mode.ebands()[band];
        let stride = mode.block_stride();
        IntraContext {
            norm: &self.norm[..stride * n0],
            stride,
            n0,
            nmax: mode.ebands()[mode.nb_ebands() + 1],
        }
    }

    fn store_context(&mut self, xb: &[f32], start: usize, scale: f32) {
        for (dst, &v) in self.norm[start..start + xb.len()].iter_mut().zip(xb) {
            *dst = v * scale;
        }
    }
}

fn check_len(mode: &Mode, name: &str, buf: &[f32]) -> CeresResult<()> {
    if buf.len() < mode.spectrum_len() {
        return Err(CeresError::InvalidArgument(format!(
            "{} 长度 {} 小于模式要求的 {}",
            name,
            buf.len(),
            mode.spectrum_len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celt::entcode::{RawBitDecoder, RawBitEncoder};
    use crate::celt::{compute_band_energies, normalise_bands};

    fn normalised(mode: &Mode, seed: usize) -> Vec<f32> {
        let freq: Vec<f32> = (0..mode.spectrum_len())
            .map(|i| (((i + seed) * 37 % 23) as f32 - 11.0) * 0.07)
            .collect();
        let mut bank = vec![0.0f32; mode.nb_ebands() * mode.nb_channels()];
        compute_band_energies(mode, &freq, &mut bank);
        let mut x = vec![0.0f32; mode.spectrum_len()];
        normalise_bands(mode, &freq, &mut x, &bank);
        x
    }

    fn roundtrip(mode: &Mode, total_bits: i32, with_pitch: bool) -> (Vec<f32>, Vec<f32>, i32) {
        let x0 = normalised(mode, 3);
        let p0: Vec<f32> = if with_pitch {
            normalised(mode, 5).iter().map(|v| v * 0.5).collect()
        } else {
            vec![0.0; mode.spectrum_len()]
        };
        let w = vec![1.0f32; mode.spectrum_len()];

        let mut x = x0.clone();
        let mut p = p0.clone();
        let mut enc = RawBitEncoder::new();
        let mut quantizer = ResidualQuantizer::reference(QuantConfig::default());
        quantizer
            .quant_bands(mode, &mut x, &mut p, &w, total_bits, &mut enc)
            .unwrap();
        let used = enc.tell();
        let data = enc.finish();

        let mut y = vec![0.0f32; mode.spectrum_len()];
        let mut q = p0;
        let mut dec = RawBitDecoder::new(&data);
        let mut dequantizer = ResidualQuantizer::reference(QuantConfig::default());
        dequantizer
            .unquant_bands(mode, &mut y, &mut q, total_bits, &mut dec)
            .unwrap();
        (x, y, used)
    }

    #[test]
    fn test_encoder_and_decoder_agree_bit_exactly() {
        for (channels, blocks) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            let mode = Mode::standard(blocks, channels).unwrap();
            for bits in [0, 16, 120, 600] {
                for with_pitch in [false, true] {
                    let (x, y, used) = roundtrip(&mode, bits, with_pitch);
                    assert_eq!(x, y, "C={} B={} bits={}", channels, blocks, bits);
                    assert!(used <= bits.max(0));
                }
            }
        }
    }

    #[test]
    fn test_every_band_has_unit_norm() {
        let mode = Mode::standard(1, 2).unwrap();
        let (x, _, _) = roundtrip(&mode, 400, true);
        for band in 0..mode.nb_ebands() {
            let e: f32 = x[mode.band_range(band)].iter().map(|v| v * v).sum();
            assert!((e - 1.0).abs() < 1e-3, "频带 {} 能量 {}", band, e);
        }
        assert!(x[mode.padding_range()].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zero_budget_folds_every_band() {
        let mode = Mode::standard(1, 1).unwrap();
        let (x, _, used) = roundtrip(&mode, 0, false);
        assert_eq!(used, 0);
        // 第一个频带没有上下文, 退化为平坦向量
        let first = &x[mode.band_range(0)];
        let h = std::f32::consts::FRAC_1_SQRT_2;
        assert!(first.iter().all(|&v| (v - h).abs() < 1e-6));
    }

    #[test]
    fn test_more_bits_track_input_closer() {
        let mode = Mode::standard(1, 1).unwrap();
        let x0 = normalised(&mode, 3);
        let err = |bits| {
            let (x, _, _) = roundtrip(&mode, bits, false);
            x.iter().zip(&x0).map(|(a, b)| (a - b) * (a - b)).sum::<f32>()
        };
        assert!(err(1200) < err(60));
    }

    /// 在参考码本之后追加固定填充位的码本, 并如实报告开销
    struct PaddedCodebook;

    const PADDING_BITS: u32 = 7;

    impl PulseCodebook for PaddedCodebook {
        fn quant<E: EntropyEncoder>(
            &self,
            x: &mut [f32],
            w: &[f32],
            k: usize,
            p: &[f32],
            alpha: f32,
            enc: &mut E,
        ) -> CeresResult<()> {
            GreedyPulseCodebook.quant(x, w, k, p, alpha, enc)?;
            enc.encode_bits(0, PADDING_BITS);
            Ok(())
        }

        fn unquant<D: EntropyDecoder>(
            &self,
            x: &mut [f32],
            k: usize,
            p: &[f32],
            alpha: f32,
            dec: &mut D,
        ) -> CeresResult<()> {
            GreedyPulseCodebook.unquant(x, k, p, alpha, dec)?;
            dec.decode_bits(PADDING_BITS)?;
            Ok(())
        }

        fn pulse_bits(&self, n: usize, k: usize) -> u32 {
            match GreedyPulseCodebook.pulse_bits(n, k) {
                0 => 0,
                bits => bits + PADDING_BITS,
            }
        }
    }

    #[test]
    fn test_custom_codebook_stays_within_budget() {
        for (blocks, channels) in [(1, 1), (1, 2), (2, 2)] {
            let mode = Mode::standard(blocks, channels).unwrap();
            let w = vec![1.0f32; mode.spectrum_len()];
            for bits in [8, 50, 300, 1200] {
                let mut x = normalised(&mode, 4);
                let mut p = vec![0.0f32; mode.spectrum_len()];
                let mut enc = RawBitEncoder::new();
                let mut quantizer = ResidualQuantizer::new(
                    LevelAllocator,
                    PaddedCodebook,
                    FoldingPredictor,
                    QuantConfig::default(),
                );
                quantizer
                    .quant_bands(&mode, &mut x, &mut p, &w, bits, &mut enc)
                    .unwrap();
                assert!(enc.tell() <= bits, "bits={} tell={}", bits, enc.tell());
                let data = enc.finish();

                let mut y = vec![0.0f32; mode.spectrum_len()];
                let mut q = vec![0.0f32; mode.spectrum_len()];
                let mut dec = RawBitDecoder::new(&data);
                let mut dequantizer = ResidualQuantizer::new(
                    LevelAllocator,
                    PaddedCodebook,
                    FoldingPredictor,
                    QuantConfig::default(),
                );
                dequantizer
                    .unquant_bands(&mode, &mut y, &mut q, bits, &mut dec)
                    .unwrap();
                assert_eq!(x, y);
            }
        }
    }

    #[test]
    fn test_short_buffer_is_invalid_argument() {
        let mode = Mode::standard(1, 1).unwrap();
        let mut x = vec![0.0f32; 10];
        let mut p = vec![0.0f32; mode.spectrum_len()];
        let w = vec![1.0f32; mode.spectrum_len()];
        let mut enc = RawBitEncoder::new();
        let err = ResidualQuantizer::reference(QuantConfig::default())
            .quant_bands(&mode, &mut x, &mut p, &w, 100, &mut enc)
            .unwrap_err();
        assert!(matches!(err, CeresError::InvalidArgument(_)));
    }

    #[test]
    fn test_truncated_stream_fails_to_decode() {
        let mode = Mode::standard(1, 1).unwrap();
        let mut x = normalised(&mode, 1);
        let mut p = vec![0.0f32; mode.spectrum_len()];
        let w = vec![1.0f32; mode.spectrum_len()];
        let mut enc = RawBitEncoder::new();
        let mut quantizer = ResidualQuantizer::reference(QuantConfig::default());
        quantizer
            .quant_bands(&mode, &mut x, &mut p, &w, 400, &mut enc)
            .unwrap();
        let data = enc.finish();

        let mut y = vec![0.0f32; mode.spectrum_len()];
        let mut q = vec![0.0f32; mode.spectrum_len()];
        let mut dec = RawBitDecoder::new(&data[..data.len() / 2]);
        assert!(
            quantizer
                .unquant_bands(&mode, &mut y, &mut q, 400, &mut dec)
                .is_err()
        );
    }
}

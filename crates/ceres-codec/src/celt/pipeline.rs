//! 帧级编解码驱动.
//!
//! 把频带层的各个步骤串起来:
//!
//! 编码: 频带能量 → 归一化 → 立体声混合 → 重新归一化 → 基音预测增益 → 残差量化
//! 解码: 重建基音预测 → 残差反量化 → 立体声反混合 → 重新归一化 → 反归一化
//!
//! 立体声旋转带有随频带能量变化的缩放, 混合与反混合之后都要重新归一化,
//! 残差量化器和反归一化才能拿到单位能量的频带.
//!
//! 频带能量与基音增益不在本层量化, 以原始值随 [`EncodedFrame`] 一起传递.

use std::sync::Arc;

use ceres_core::{CeresError, CeresResult};
use log::debug;

use super::bands::{
    compute_band_energies, denormalise_bands, normalise_bands, renormalise_bands,
};
use super::entcode::{EntropyDecoder, EntropyEncoder, RawBitDecoder, RawBitEncoder};
use super::pitch::{compute_pitch_gain, pitch_quant_bands};
use super::quant::{QuantConfig, ResidualQuantizer};
use super::stereo::{MixDirection, stereo_mix};
use super::Mode;

/// 一帧编码结果
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    /// 残差码流
    pub payload: Vec<u8>,
    /// 每个频带每个声道的幅度 `bank[i·C + c]`
    pub bank: Vec<f32>,
    /// 每个基音频带的预测增益
    pub gains: Vec<f32>,
    /// 帧的比特预算
    pub total_bits: i32,
    /// 实际写出的比特数
    pub bits_used: i32,
    /// 编码端重建的归一化频谱 (立体声混合域)
    pub reconstruction: Vec<f32>,
}

/// 把基音频谱按自身能量归一化, 再用信号的能量做立体声混合
fn prepare_pitch(mode: &Mode, pitch_freq: &[f32], bank: &[f32]) -> Vec<f32> {
    let mut pitch_bank = vec![0.0f32; mode.nb_ebands() * mode.nb_channels()];
    compute_band_energies(mode, pitch_freq, &mut pitch_bank);
    let mut p = vec![0.0f32; mode.spectrum_len()];
    normalise_bands(mode, pitch_freq, &mut p, &pitch_bank);
    if mode.nb_channels() == 2 {
        stereo_mix(mode, &mut p, bank, MixDirection::Mix);
        renormalise_bands(mode, &mut p);
    }
    p
}

fn check_spectrum(mode: &Mode, name: &str, buf: &[f32]) -> CeresResult<()> {
    if buf.len() != mode.spectrum_len() {
        return Err(CeresError::InvalidArgument(format!(
            "{} 长度 {} 与模式频谱长度 {} 不符",
            name,
            buf.len(),
            mode.spectrum_len()
        )));
    }
    Ok(())
}

/// 频带编码器
#[derive(Debug)]
pub struct BandEncoder {
    mode: Arc<Mode>,
    quantizer: ResidualQuantizer,
}

impl BandEncoder {
    pub fn new(mode: Arc<Mode>) -> Self {
        Self::with_config(mode, QuantConfig::default())
    }

    pub fn with_config(mode: Arc<Mode>, config: QuantConfig) -> Self {
        Self {
            mode,
            quantizer: ResidualQuantizer::reference(config),
        }
    }

    pub fn mode(&self) -> &Arc<Mode> {
        &self.mode
    }

    /// 编码一帧 MDCT 系数
    ///
    /// `pitch_freq` 为基音预测的 MDCT 系数 (没有时传全零), `total_bits` 为残差码流的预算.
    pub fn encode(
        &mut self,
        freq: &[f32],
        pitch_freq: &[f32],
        total_bits: i32,
    ) -> CeresResult<EncodedFrame> {
        let mode = Arc::clone(&self.mode);
        check_spectrum(&mode, "freq", freq)?;
        check_spectrum(&mode, "pitch_freq", pitch_freq)?;
        if total_bits < 0 {
            return Err(CeresError::InvalidArgument(format!(
                "比特预算不能为负: {}",
                total_bits
            )));
        }

        let mut bank = vec![0.0f32; mode.nb_ebands() * mode.nb_channels()];
        compute_band_energies(&mode, freq, &mut bank);
        let mut x = vec![0.0f32; mode.spectrum_len()];
        normalise_bands(&mode, freq, &mut x, &bank);
        if mode.nb_channels() == 2 {
            stereo_mix(&mode, &mut x, &bank, MixDirection::Mix);
            renormalise_bands(&mode, &mut x);
        }

        let mut p = prepare_pitch(&mode, pitch_freq, &bank);
        let gains = compute_pitch_gain(&mode, &x, &mut p, &bank);
        pitch_quant_bands(&mode, &mut p, &gains);

        let w = vec![1.0f32; mode.spectrum_len()];
        let mut enc = RawBitEncoder::with_capacity((total_bits as usize).div_ceil(8));
        self.quantizer
            .quant_bands(&mode, &mut x, &mut p, &w, total_bits, &mut enc)?;
        let bits_used = enc.tell();
        debug!("编码一帧: {}/{} 比特", bits_used, total_bits);

        Ok(EncodedFrame {
            payload: enc.finish(),
            bank,
            gains,
            total_bits,
            bits_used,
            reconstruction: x,
        })
    }
}

/// 频带解码器
#[derive(Debug)]
pub struct BandDecoder {
    mode: Arc<Mode>,
    quantizer: ResidualQuantizer,
    shape: Vec<f32>,
}

impl BandDecoder {
    pub fn new(mode: Arc<Mode>) -> Self {
        Self::with_config(mode, QuantConfig::default())
    }

    pub fn with_config(mode: Arc<Mode>, config: QuantConfig) -> Self {
        Self {
            mode,
            quantizer: ResidualQuantizer::reference(config),
            shape: Vec::new(),
        }
    }

    pub fn mode(&self) -> &Arc<Mode> {
        &self.mode
    }

    /// 最近一帧解码得到的归一化频谱 (立体声混合域), 与编码端的重建值逐位一致
    pub fn shape(&self) -> &[f32] {
        &self.shape
    }

    /// 解码一帧, 返回 MDCT 系数
    pub fn decode(&mut self, frame: &EncodedFrame, pitch_freq: &[f32]) -> CeresResult<Vec<f32>> {
        let mode = Arc::clone(&self.mode);
        check_spectrum(&mode, "pitch_freq", pitch_freq)?;
        let bank_len = mode.nb_ebands() * mode.nb_channels();
        if frame.bank.len() != bank_len || frame.gains.len() != mode.nb_pbands() {
            return Err(CeresError::InvalidData(format!(
                "帧参数与模式不符: bank={} gains={}",
                frame.bank.len(),
                frame.gains.len()
            )));
        }

        let mut p = prepare_pitch(&mode, pitch_freq, &frame.bank);
        pitch_quant_bands(&mode, &mut p, &frame.gains);

        self.shape.clear();
        self.shape.resize(mode.spectrum_len(), 0.0);
        let mut dec = RawBitDecoder::new(&frame.payload);
        self.quantizer
            .unquant_bands(&mode, &mut self.shape, &mut p, frame.total_bits, &mut dec)?;
        debug!("解码一帧: {}/{} 比特", dec.tell(), frame.total_bits);

        let mut x = self.shape.clone();
        if mode.nb_channels() == 2 {
            stereo_mix(&mode, &mut x, &frame.bank, MixDirection::Unmix);
            renormalise_bands(&mode, &mut x);
        }
        let mut freq = vec![0.0f32; mode.spectrum_len()];
        denormalise_bands(&mode, &x, &mut freq, &frame.bank);
        Ok(freq)
    }
}

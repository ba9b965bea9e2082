//! ceres - 频带编解码命令行工具
//!
//! 合成 MDCT 域测试信号, 逐帧经过频带编码和解码, 统计比特使用、信噪比
//! 以及编解码两端重建是否逐位一致.

mod config;
mod logging;
mod synth;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use ceres_codec::celt::ActiveScaling;
use ceres_codec::{BandDecoder, BandEncoder, Mode};
use ceres_core::Scaling;
use clap::Parser;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use config::ModeConfig;
use synth::ToneSource;

#[derive(Parser, Debug)]
#[command(name = "ceres", version, about = "MDCT 频带编解码测试工具")]
struct Cli {
    /// 声道数 (1 或 2)
    #[arg(short, long, default_value_t = 1)]
    channels: usize,

    /// 每帧 MDCT 块数
    #[arg(short, long, default_value_t = 1)]
    blocks: usize,

    /// 自定义频带划分 (JSON), 指定后忽略 --channels/--blocks
    #[arg(long = "mode-file")]
    mode_file: Option<PathBuf>,

    /// 每帧残差比特预算
    #[arg(long, default_value_t = 256)]
    bits: i32,

    /// 帧数
    #[arg(short = 'n', long, default_value_t = 50)]
    frames: usize,

    /// 基频所在频点
    #[arg(long, default_value_t = 6.0)]
    fundamental: f32,

    /// 噪声幅度
    #[arg(long, default_value_t = 0.02)]
    noise: f32,

    /// 右声道相对左声道的增益
    #[arg(long, default_value_t = 0.6)]
    balance: f32,

    /// 不使用上一帧作为基音预测
    #[arg(long)]
    no_pitch: bool,

    /// 将逐帧统计写入 JSON 文件
    #[arg(long)]
    report: Option<PathBuf>,

    /// 日志目录
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// 单帧统计
#[derive(Debug, Clone, Serialize)]
struct FrameReport {
    index: usize,
    bits_used: i32,
    payload_bytes: usize,
    snr_db: f64,
    bit_exact: bool,
}

/// 整体统计
#[derive(Debug, Serialize)]
struct Summary {
    scaling: &'static str,
    nb_channels: usize,
    nb_mdct_blocks: usize,
    total_bits: i32,
    frames: Vec<FrameReport>,
    mean_bits: f64,
    mean_snr_db: f64,
    min_snr_db: f64,
    mismatches: usize,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(&cli.log_dir, "ceres-cli", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }
    if let Err(e) = run(&cli) {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    ensure!(cli.bits >= 0, "比特预算不能为负: {}", cli.bits);
    ensure!(cli.fundamental > 0.0, "基频必须为正: {}", cli.fundamental);

    let mode = match &cli.mode_file {
        Some(path) => ModeConfig::load(path)?.into_mode()?,
        None => Mode::standard(cli.blocks, cli.channels).context("创建内置模式失败")?,
    };
    let mode = Arc::new(mode);
    info!(
        "模式: {} 声道, {} 块, {} 个能量频带, {} 个基音频带, 缩放 {}",
        mode.nb_channels(),
        mode.nb_mdct_blocks(),
        mode.nb_ebands(),
        mode.nb_pbands(),
        ActiveScaling::NAME
    );

    let source = ToneSource {
        fundamental: cli.fundamental,
        noise: cli.noise,
        balance: cli.balance,
    };

    // 各帧只依赖帧号, 互相独立, 按帧并行
    let frames = (0..cli.frames)
        .into_par_iter()
        .map_init(
            || {
                (
                    BandEncoder::new(Arc::clone(&mode)),
                    BandDecoder::new(Arc::clone(&mode)),
                )
            },
            |(encoder, decoder), index| {
                process_frame(encoder, decoder, &source, index, cli.bits, !cli.no_pitch)
            },
        )
        .collect::<Result<Vec<_>>>()?;

    let summary = summarize(&mode, cli.bits, frames);
    info!(
        "{} 帧: 平均 {:.1}/{} 比特, 平均 SNR {:.2} dB, 最低 {:.2} dB",
        summary.frames.len(),
        summary.mean_bits,
        summary.total_bits,
        summary.mean_snr_db,
        summary.min_snr_db
    );
    if summary.mismatches > 0 {
        warn!("{} 帧的编解码重建不一致", summary.mismatches);
    }

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("写入报告失败: {}", path.display()))?;
        info!("报告已写入 {}", path.display());
    }

    ensure!(summary.mismatches == 0, "编解码重建不一致");
    Ok(())
}

fn process_frame(
    encoder: &mut BandEncoder,
    decoder: &mut BandDecoder,
    source: &ToneSource,
    index: usize,
    bits: i32,
    use_pitch: bool,
) -> Result<FrameReport> {
    let mode = Arc::clone(encoder.mode());
    let freq = source.frame(&mode, index);
    let pitch = if use_pitch && index > 0 {
        source.frame(&mode, index - 1)
    } else {
        vec![0.0; mode.spectrum_len()]
    };

    let frame = encoder
        .encode(&freq, &pitch, bits)
        .with_context(|| format!("第 {} 帧编码失败", index))?;
    let decoded = decoder
        .decode(&frame, &pitch)
        .with_context(|| format!("第 {} 帧解码失败", index))?;

    let report = FrameReport {
        index,
        bits_used: frame.bits_used,
        payload_bytes: frame.payload.len(),
        snr_db: snr_db(&freq, &decoded),
        bit_exact: decoder.shape() == &frame.reconstruction[..],
    };
    debug!(
        "帧 {}: {} 比特, SNR {:.2} dB, 增益 {:?}",
        index, report.bits_used, report.snr_db, frame.gains
    );
    Ok(report)
}

fn snr_db(reference: &[f32], decoded: &[f32]) -> f64 {
    let mut signal = 0.0f64;
    let mut noise = 0.0f64;
    for (&a, &b) in reference.iter().zip(decoded) {
        signal += f64::from(a) * f64::from(a);
        noise += f64::from(a - b) * f64::from(a - b);
    }
    10.0 * (signal.max(1e-30) / noise.max(1e-30)).log10()
}

fn summarize(mode: &Mode, total_bits: i32, frames: Vec<FrameReport>) -> Summary {
    let count = frames.len().max(1) as f64;
    let mean_bits = frames.iter().map(|f| f64::from(f.bits_used)).sum::<f64>() / count;
    let mean_snr_db = frames.iter().map(|f| f.snr_db).sum::<f64>() / count;
    let min_snr_db = frames
        .iter()
        .map(|f| f.snr_db)
        .fold(f64::INFINITY, f64::min);
    let mismatches = frames.iter().filter(|f| !f.bit_exact).count();
    Summary {
        scaling: ActiveScaling::NAME,
        nb_channels: mode.nb_channels(),
        nb_mdct_blocks: mode.nb_mdct_blocks(),
        total_bits,
        frames,
        mean_bits,
        mean_snr_db,
        min_snr_db: if min_snr_db.is_finite() { min_snr_db } else { 0.0 },
        mismatches,
    }
}

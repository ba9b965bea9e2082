//! Ceres 频带层性能基准测试.
//!
//! 覆盖能量提取与归一化、扩频旋转、残差量化以及完整的帧级编解码.

use std::sync::Arc;

use ceres::codec::celt::{
    BandDecoder, BandEncoder, Mode, QuantConfig, ROTATION_ITERATIONS, RawBitEncoder,
    ResidualQuantizer, compute_band_energies, exp_rotation, normalise_bands,
};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

/// 生成一帧确定性的测试频谱
fn make_spectrum(mode: &Mode) -> Vec<f32> {
    let mut freq: Vec<f32> = (0..mode.spectrum_len())
        .map(|i| ((i as f32) * 0.37).sin() * (1.0 + 16.0 / (1.0 + i as f32)))
        .collect();
    freq[mode.padding_range()].fill(0.0);
    freq
}

fn bench_normalise(c: &mut Criterion) {
    let mode = Mode::standard(2, 2).unwrap();
    let freq = make_spectrum(&mode);
    let mut bank = vec![0.0f32; mode.nb_ebands() * mode.nb_channels()];
    let mut x = vec![0.0f32; mode.spectrum_len()];
    c.bench_function("energies_normalise_stereo_b2", |b| {
        b.iter(|| {
            compute_band_energies(&mode, black_box(&freq), &mut bank);
            normalise_bands(&mode, &freq, &mut x, &bank);
            black_box(&x);
        });
    });
}

fn bench_rotation(c: &mut Criterion) {
    let mut x: Vec<f32> = (0..80).map(|i| (i as f32 * 0.1).cos()).collect();
    c.bench_function("exp_rotation_80_stride4", |b| {
        b.iter(|| {
            exp_rotation(black_box(&mut x), 0.05, -1, 4, ROTATION_ITERATIONS);
            exp_rotation(&mut x, 0.05, 1, 4, ROTATION_ITERATIONS);
        });
    });
}

fn bench_quant_bands(c: &mut Criterion) {
    let mode = Mode::standard(1, 1).unwrap();
    let freq = make_spectrum(&mode);
    let mut bank = vec![0.0f32; mode.nb_ebands()];
    compute_band_energies(&mode, &freq, &mut bank);
    let mut x0 = vec![0.0f32; mode.spectrum_len()];
    normalise_bands(&mode, &freq, &mut x0, &bank);
    let w = vec![1.0f32; mode.spectrum_len()];
    let mut quantizer = ResidualQuantizer::reference(QuantConfig::default());

    c.bench_function("quant_bands_mono_512bits", |b| {
        b.iter(|| {
            let mut x = x0.clone();
            let mut p = vec![0.0f32; mode.spectrum_len()];
            let mut enc = RawBitEncoder::with_capacity(64);
            quantizer
                .quant_bands(&mode, &mut x, &mut p, &w, 512, &mut enc)
                .unwrap();
            black_box(enc.finish());
        });
    });
}

fn bench_frame_roundtrip(c: &mut Criterion) {
    let mode = Arc::new(Mode::standard(1, 2).unwrap());
    let freq = make_spectrum(&mode);
    let pitch: Vec<f32> = freq.iter().map(|v| v * 0.8).collect();
    let mut encoder = BandEncoder::new(Arc::clone(&mode));
    let mut decoder = BandDecoder::new(Arc::clone(&mode));

    c.bench_function("frame_encode_decode_stereo_800bits", |b| {
        b.iter(|| {
            let frame = encoder.encode(black_box(&freq), &pitch, 800).unwrap();
            black_box(decoder.decode(&frame, &pitch).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_normalise,
    bench_rotation,
    bench_quant_bands,
    bench_frame_roundtrip,
);
criterion_main!(benches);

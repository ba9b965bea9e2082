//! 频带划分模式.
//!
//! 一个 [`Mode`] 描述一种工作配置下的频谱划分: MDCT 块数、声道数、能量频带边界、
//! 基音频带边界以及基音预测截止点. 构造后只读, 可以通过 `Arc` 在线程间共享.

use std::ops::Range;

use ceres_core::{CeresError, CeresResult};

/// 内置能量频带边界 (单位: MDCT 频点), 最后一项为补零后的频谱末端
const STANDARD_EBANDS: [usize; 21] = [
    0, 2, 4, 6, 8, 10, 12, 14, 16, 20, 24, 28, 32, 40, 48, 56, 68, 80, 96, 116, 128,
];

/// 内置基音频带边界, 最后一项为补零末端
const STANDARD_PBANDS: [usize; 11] = [0, 4, 8, 12, 16, 24, 32, 48, 68, 116, 128];

/// 内置模式的基音预测截止频点
const STANDARD_PITCH_END: usize = 48;

/// 频带划分模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    nb_mdct_blocks: usize,
    nb_channels: usize,
    /// 长度 `nb_ebands + 2`
    ebands: Vec<usize>,
    /// 长度 `nb_pbands + 2`
    pbands: Vec<usize>,
    pitch_end: usize,
}

impl Mode {
    /// 创建并校验模式
    ///
    /// `ebands` 与 `pbands` 都包含末尾的补零边界, 即长度分别为频带数 + 2.
    pub fn new(
        nb_mdct_blocks: usize,
        nb_channels: usize,
        ebands: Vec<usize>,
        pbands: Vec<usize>,
        pitch_end: usize,
    ) -> CeresResult<Self> {
        if nb_mdct_blocks == 0 {
            return Err(CeresError::InvalidArgument("MDCT 块数必须为正".into()));
        }
        if !(1..=2).contains(&nb_channels) {
            return Err(CeresError::InvalidArgument(format!(
                "声道数只能为 1 或 2, 实际为 {}",
                nb_channels
            )));
        }
        if ebands.len() < 3 {
            return Err(CeresError::InvalidArgument(
                "ebands 至少需要一个频带和补零边界".into(),
            ));
        }
        if pbands.len() < 2 {
            return Err(CeresError::InvalidArgument(
                "pbands 至少需要起点和补零边界".into(),
            ));
        }

        let nb_ebands = ebands.len() - 2;
        let nb_pbands = pbands.len() - 2;
        check_boundaries("ebands", &ebands[..=nb_ebands])?;
        check_boundaries("pbands", &pbands[..=nb_pbands])?;

        let spectrum_end = ebands[nb_ebands + 1];
        if spectrum_end < ebands[nb_ebands] {
            return Err(CeresError::InvalidArgument(format!(
                "ebands 补零末端 {} 小于最后频带上界 {}",
                spectrum_end, ebands[nb_ebands]
            )));
        }
        if pbands[nb_pbands] > ebands[nb_ebands] {
            return Err(CeresError::InvalidArgument(format!(
                "基音频带上界 {} 超出能量频带上界 {}",
                pbands[nb_pbands], ebands[nb_ebands]
            )));
        }
        if pbands[nb_pbands + 1] < pbands[nb_pbands] || pbands[nb_pbands + 1] > spectrum_end {
            return Err(CeresError::InvalidArgument(format!(
                "pbands 补零末端 {} 不在 [{}, {}] 内",
                pbands[nb_pbands + 1],
                pbands[nb_pbands],
                spectrum_end
            )));
        }
        if !ebands[..=nb_ebands].contains(&pitch_end) {
            return Err(CeresError::InvalidArgument(format!(
                "pitch_end={} 未对齐到能量频带边界",
                pitch_end
            )));
        }
        if pitch_end > pbands[nb_pbands] {
            // 截止点之下的频带都要用到基音增益
            return Err(CeresError::InvalidArgument(format!(
                "pitch_end={} 超出基音频带上界 {}",
                pitch_end, pbands[nb_pbands]
            )));
        }

        Ok(Self {
            nb_mdct_blocks,
            nb_channels,
            ebands,
            pbands,
            pitch_end,
        })
    }

    /// 内置模式: 19 个能量频带覆盖 116 个频点 (补零至 128), 9 个基音频带
    ///
    /// 参数顺序与 [`Mode::new`] 相同.
    pub fn standard(nb_mdct_blocks: usize, nb_channels: usize) -> CeresResult<Self> {
        Self::new(
            nb_mdct_blocks,
            nb_channels,
            STANDARD_EBANDS.to_vec(),
            STANDARD_PBANDS.to_vec(),
            STANDARD_PITCH_END,
        )
    }

    pub fn nb_mdct_blocks(&self) -> usize {
        self.nb_mdct_blocks
    }

    pub fn nb_channels(&self) -> usize {
        self.nb_channels
    }

    pub fn nb_ebands(&self) -> usize {
        self.ebands.len() - 2
    }

    pub fn nb_pbands(&self) -> usize {
        self.pbands.len() - 2
    }

    /// 能量频带边界 (含补零末端)
    pub fn ebands(&self) -> &[usize] {
        &self.ebands
    }

    /// 基音频带边界 (含补零末端)
    pub fn pbands(&self) -> &[usize] {
        &self.pbands
    }

    pub fn pitch_end(&self) -> usize {
        self.pitch_end
    }

    /// 块与声道交织的周期 `B·C`
    pub fn block_stride(&self) -> usize {
        self.nb_mdct_blocks * self.nb_channels
    }

    /// 一帧频谱缓冲区的长度 `B·C·ebands[nb_ebands+1]`
    pub fn spectrum_len(&self) -> usize {
        self.block_stride() * self.ebands[self.nb_ebands() + 1]
    }

    /// 频带 `i` 在单声道位置 `j` 上的范围 `[B·ebands[i], B·ebands[i+1])`,
    /// 声道 `c` 的样本位于 `j·C + c`
    pub fn band_positions(&self, band: usize) -> Range<usize> {
        let b = self.nb_mdct_blocks;
        b * self.ebands[band]..b * self.ebands[band + 1]
    }

    /// 频带 `i` 在交织缓冲区中的范围 (所有声道)
    pub fn band_range(&self, band: usize) -> Range<usize> {
        let stride = self.block_stride();
        stride * self.ebands[band]..stride * self.ebands[band + 1]
    }

    /// 基音频带 `p` 在交织缓冲区中的范围 (所有声道)
    pub fn pitch_band_range(&self, band: usize) -> Range<usize> {
        let stride = self.block_stride();
        stride * self.pbands[band]..stride * self.pbands[band + 1]
    }

    /// 能量频带之上的补零区
    pub fn padding_range(&self) -> Range<usize> {
        let nb = self.nb_ebands();
        let stride = self.block_stride();
        stride * self.ebands[nb]..stride * self.ebands[nb + 1]
    }

    /// 最后一个基音频带之上的补零区
    pub fn pitch_padding_range(&self) -> Range<usize> {
        let nb = self.nb_pbands();
        let stride = self.block_stride();
        stride * self.pbands[nb]..stride * self.pbands[nb + 1]
    }

    /// 能量频带 `i` 的宽度 (频点数)
    pub fn band_width(&self, band: usize) -> usize {
        self.ebands[band + 1] - self.ebands[band]
    }

    /// 频带 `i` 是否落在基音预测截止点之上
    pub fn is_above_pitch_end(&self, band: usize) -> bool {
        self.ebands[band] >= self.pitch_end
    }

    /// 按约定检查缓冲区长度, 不足时 panic
    pub(crate) fn assert_spectrum(&self, name: &str, buf: &[f32]) {
        assert!(
            buf.len() >= self.spectrum_len(),
            "{} 长度 {} 小于模式要求的 {}",
            name,
            buf.len(),
            self.spectrum_len()
        );
    }

    /// 按约定检查能量数组长度, 不足时 panic
    pub(crate) fn assert_bank(&self, bank: &[f32]) {
        let expected = self.nb_ebands() * self.nb_channels;
        assert!(
            bank.len() >= expected,
            "能量数组长度 {} 小于 {}",
            bank.len(),
            expected
        );
    }
}

fn check_boundaries(name: &str, bounds: &[usize]) -> CeresResult<()> {
    if bounds.first() != Some(&0) {
        return Err(CeresError::InvalidArgument(format!("{} 必须从 0 开始", name)));
    }
    if let Some(w) = bounds.windows(2).find(|w| w[0] >= w[1]) {
        return Err(CeresError::InvalidArgument(format!(
            "{} 边界必须严格递增: {} >= {}",
            name, w[0], w[1]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_mode_layout() {
        let mode = Mode::standard(2, 2).unwrap();
        assert_eq!(mode.nb_ebands(), 19);
        assert_eq!(mode.nb_pbands(), 9);
        assert_eq!(mode.block_stride(), 4);
        assert_eq!(mode.spectrum_len(), 4 * 128);
        assert_eq!(mode.band_range(18), 4 * 96..4 * 116);
        assert_eq!(mode.band_positions(18), 2 * 96..2 * 116);
        assert_eq!(mode.padding_range(), 4 * 116..4 * 128);
        assert_eq!(mode.pitch_padding_range(), 4 * 116..4 * 128);
        assert!(mode.is_above_pitch_end(14));
        assert!(!mode.is_above_pitch_end(13));
    }

    #[test]
    fn test_rejects_bad_channels_and_blocks() {
        assert!(Mode::new(1, 3, vec![0, 8, 8], vec![0, 8, 8], 8).is_err());
        assert!(Mode::new(0, 1, vec![0, 8, 8], vec![0, 8, 8], 8).is_err());
    }

    #[test]
    fn test_rejects_non_increasing_ebands() {
        let err = Mode::new(1, 1, vec![0, 4, 4, 8], vec![0, 4, 8], 4).unwrap_err();
        assert!(matches!(err, CeresError::InvalidArgument(_)));
    }

    #[test]
    fn test_rejects_pbands_beyond_ebands() {
        assert!(Mode::new(1, 1, vec![0, 4, 8, 8], vec![0, 12, 12], 4).is_err());
        assert!(Mode::new(1, 1, vec![0, 4, 8, 10], vec![0, 8, 12], 4).is_err());
    }

    #[test]
    fn test_rejects_misaligned_pitch_end() {
        assert!(Mode::new(1, 1, vec![0, 4, 8, 8], vec![0, 8, 8], 5).is_err());
        assert!(Mode::new(1, 1, vec![0, 4, 8, 8], vec![0, 8, 8], 8).is_ok());
    }

    #[test]
    fn test_rejects_pitch_end_beyond_pbands() {
        let err = Mode::new(1, 1, vec![0, 4, 8, 12, 12], vec![0, 4, 4], 8).unwrap_err();
        assert!(matches!(err, CeresError::InvalidArgument(_)));
        assert!(Mode::new(1, 1, vec![0, 4, 8, 12, 12], vec![0, 4, 8, 8], 8).is_ok());
    }

    #[test]
    fn test_standard_takes_blocks_then_channels() {
        let mode = Mode::standard(4, 1).unwrap();
        assert_eq!(mode.nb_mdct_blocks(), 4);
        assert_eq!(mode.nb_channels(), 1);
        assert_eq!(mode.pitch_end(), 48);
        assert!(Mode::standard(1, 4).is_err());
    }

    #[test]
    fn test_single_band_without_padding() {
        let mode = Mode::new(1, 1, vec![0, 8, 8], vec![0, 8, 8], 8).unwrap();
        assert_eq!(mode.spectrum_len(), 8);
        assert!(mode.padding_range().is_empty());
    }
}

//! 自定义频带划分的 JSON 配置.
//!
//! ```json
//! {
//!   "nb_mdct_blocks": 1,
//!   "nb_channels": 2,
//!   "ebands": [0, 4, 8, 16, 24, 32],
//!   "pbands": [0, 8, 16, 24],
//!   "pitch_end": 16
//! }
//! ```
//!
//! `ebands` / `pbands` 都包含末尾的补零边界.

use std::path::Path;

use anyhow::{Context, Result};
use ceres_codec::Mode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModeConfig {
    #[serde(default = "default_blocks")]
    pub nb_mdct_blocks: usize,
    #[serde(default = "default_channels")]
    pub nb_channels: usize,
    pub ebands: Vec<usize>,
    pub pbands: Vec<usize>,
    pub pitch_end: usize,
}

fn default_blocks() -> usize {
    1
}

fn default_channels() -> usize {
    1
}

impl ModeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取模式文件失败: {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("解析模式文件失败: {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_mode(self) -> Result<Mode> {
        Mode::new(
            self.nb_mdct_blocks,
            self.nb_channels,
            self.ebands,
            self.pbands,
            self.pitch_end,
        )
        .context("模式参数无效")
    }
}

//! 数值缩放配置.
//!
//! 频带层的三类数据各有一个缩放因子:
//! - `ENER`: 频带能量 (幅度) 的表示比例
//! - `NORM`: 单位范数频谱的表示比例
//! - `SIG`: 信号域 MDCT 系数的表示比例
//!
//! 浮点后端全部为 1; 定点后端分别采用 Q15 与 Q31, 使浮点实现与定点实现
//! 在同一套公式下保持比特兼容. 具体选择哪一档由 `ceres-codec` 的 cargo feature 决定.

/// 缩放配置 (编译期多态)
pub trait Scaling: Copy + Default + Send + Sync + 'static {
    /// 配置名称
    const NAME: &'static str;
    /// 能量缩放
    const ENER: f32;
    /// 能量缩放的倒数
    const ENER_INV: f32;
    /// 单位范数缩放
    const NORM: f32;
    /// 单位范数缩放的倒数
    const NORM_INV: f32;
    /// 信号缩放
    const SIG: f32;
    /// 信号缩放的倒数
    const SIG_INV: f32;
}

/// 浮点后端: 全部为恒等缩放
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloatScaling;

impl Scaling for FloatScaling {
    const NAME: &'static str = "float";
    const ENER: f32 = 1.0;
    const ENER_INV: f32 = 1.0;
    const NORM: f32 = 1.0;
    const NORM_INV: f32 = 1.0;
    const SIG: f32 = 1.0;
    const SIG_INV: f32 = 1.0;
}

/// 16 位定点后端 (Q15)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fixed16Scaling;

const Q15: f32 = 32768.0;

impl Scaling for Fixed16Scaling {
    const NAME: &'static str = "fixed16";
    const ENER: f32 = Q15;
    const ENER_INV: f32 = 1.0 / Q15;
    const NORM: f32 = Q15;
    const NORM_INV: f32 = 1.0 / Q15;
    const SIG: f32 = Q15;
    const SIG_INV: f32 = 1.0 / Q15;
}

/// 32 位定点后端 (Q31)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fixed32Scaling;

const Q31: f32 = 2_147_483_648.0;

impl Scaling for Fixed32Scaling {
    const NAME: &'static str = "fixed32";
    const ENER: f32 = Q31;
    const ENER_INV: f32 = 1.0 / Q31;
    const NORM: f32 = Q31;
    const NORM_INV: f32 = 1.0 / Q31;
    const SIG: f32 = Q31;
    const SIG_INV: f32 = 1.0 / Q31;
}

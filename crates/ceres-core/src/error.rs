//! 统一错误类型定义.
//!
//! 所有 Ceres crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Ceres 统一错误类型
#[derive(Debug, Error)]
pub enum CeresError {
    /// 无效参数 (模式表或缓冲区长度不满足约定)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (损坏或被截断的码流)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 码流已读完, 仍需要更多比特
    #[error("已到达码流末尾")]
    Eof,
}

/// Ceres 统一 Result 类型
pub type CeresResult<T> = Result<T, CeresError>;

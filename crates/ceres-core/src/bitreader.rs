//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从字节缓冲区读取, 读越界时返回 [`CeresError::Eof`].

use crate::{CeresError, CeresResult};

/// 比特流读取器
///
/// # 示例
/// ```
/// use ceres_core::bitreader::BitReader;
///
/// let data = [0b1011_1110];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(3).unwrap(), 0b101);
/// assert_eq!(br.read_bits(5).unwrap(), 0b11110);
/// assert!(br.read_bit().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// 已消费的位数
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.pos
    }

    /// 剩余可读位数
    pub fn bits_left(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> CeresResult<u32> {
        self.read_bits(1)
    }

    /// 读取 `n` 个位 (最多 32 位), 高位在前
    pub fn read_bits(&mut self, n: u32) -> CeresResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(CeresError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n
            )));
        }
        if n as usize > self.bits_left() {
            return Err(CeresError::Eof);
        }

        let mut result = 0u32;
        let mut remaining = n;
        while remaining > 0 {
            let byte = self.data[self.pos / 8];
            let offset = (self.pos % 8) as u32;
            let take = remaining.min(8 - offset);
            let bits = (u32::from(byte) >> (8 - offset - take)) & ((1u32 << take) - 1);
            result = (result << take) | bits;
            self.pos += take as usize;
            remaining -= take;
        }
        Ok(result)
    }
}

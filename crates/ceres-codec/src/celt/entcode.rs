//! 熵编码器接口.
//!
//! 频带层只需要三件事: 查询已用比特数、写/读原始比特、写/读 `[0, ft)` 内的整数.
//! [`RawBitEncoder`] / [`RawBitDecoder`] 是基于比特流读写器的参考实现,
//! 每个整数固定占用 `ilog(ft - 1)` 位, 开销可精确预估.

use ceres_core::bitreader::BitReader;
use ceres_core::bitwriter::BitWriter;
use ceres_core::{CeresError, CeresResult};

/// 表示 `v` 所需的位数, `ilog(0) == 0`
pub fn ilog(v: u32) -> u32 {
    u32::BITS - v.leading_zeros()
}

/// 熵编码器 (写端)
pub trait EntropyEncoder {
    /// 已写出的比特数
    fn tell(&self) -> i32;

    /// 写入 `value` 的低 `bits` 位
    fn encode_bits(&mut self, value: u32, bits: u32);

    /// 写入 `[0, ft)` 内的整数
    fn encode_uint(&mut self, value: u32, ft: u32);
}

/// 熵编码器 (读端)
pub trait EntropyDecoder {
    /// 已读取的比特数
    fn tell(&self) -> i32;

    /// 读取 `bits` 位
    fn decode_bits(&mut self, bits: u32) -> CeresResult<u32>;

    /// 读取 `[0, ft)` 内的整数
    fn decode_uint(&mut self, ft: u32) -> CeresResult<u32>;
}

/// 原始比特编码器
#[derive(Debug, Default)]
pub struct RawBitEncoder {
    writer: BitWriter,
}

impl RawBitEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以预估的字节容量创建
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            writer: BitWriter::with_capacity(bytes),
        }
    }

    /// 结束编码, 返回按字节对齐的码流
    pub fn finish(self) -> Vec<u8> {
        self.writer.finish()
    }
}

impl EntropyEncoder for RawBitEncoder {
    fn tell(&self) -> i32 {
        self.writer.bits_written() as i32
    }

    fn encode_bits(&mut self, value: u32, bits: u32) {
        self.writer.write_bits(value, bits);
    }

    fn encode_uint(&mut self, value: u32, ft: u32) {
        debug_assert!(ft > 0 && value < ft, "encode_uint: {} 不在 [0, {}) 内", value, ft);
        self.writer.write_bits(value, ilog(ft - 1));
    }
}

/// 原始比特解码器
#[derive(Debug, Clone)]
pub struct RawBitDecoder<'a> {
    reader: BitReader<'a>,
}

impl<'a> RawBitDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: BitReader::new(data),
        }
    }
}

impl EntropyDecoder for RawBitDecoder<'_> {
    fn tell(&self) -> i32 {
        self.reader.bits_read() as i32
    }

    fn decode_bits(&mut self, bits: u32) -> CeresResult<u32> {
        self.reader.read_bits(bits)
    }

    fn decode_uint(&mut self, ft: u32) -> CeresResult<u32> {
        if ft == 0 {
            return Err(CeresError::InvalidArgument("decode_uint: ft 不能为 0".into()));
        }
        let value = self.reader.read_bits(ilog(ft - 1))?;
        if value >= ft {
            return Err(CeresError::InvalidData(format!(
                "整数 {} 超出范围 [0, {})",
                value, ft
            )));
        }
        Ok(value)
    }
}

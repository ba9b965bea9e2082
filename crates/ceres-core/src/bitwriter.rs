//! 比特流写入器.
//!
//! 参考熵编码器的底层输出, 按大端位序 (MSB first) 写入, 与 [`BitReader`](crate::bitreader::BitReader) 对应.

/// 比特流写入器
///
/// # 示例
/// ```
/// use ceres_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b101, 3);
/// bw.write_bits(0b11110, 5);
/// assert_eq!(bw.bits_written(), 8);
/// assert_eq!(bw.finish(), vec![0b1011_1110]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    /// 已完成的字节
    data: Vec<u8>,
    /// 待刷出的位 (低 `pending` 位有效)
    acc: u64,
    /// `acc` 中的有效位数 (0-7 在每次写入结束后成立)
    pending: u32,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 以指定字节容量创建
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// 已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.pending as usize
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: u32) {
        self.write_bits(bit & 1, 1);
    }

    /// 写入 `value` 的低 `n` 位 (最多 32 位), 高位在前
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        if n == 0 {
            return;
        }
        let masked = u64::from(value) & ((1u64 << n) - 1);
        self.acc = (self.acc << n) | masked;
        self.pending += n;
        while self.pending >= 8 {
            self.pending -= 8;
            self.data.push((self.acc >> self.pending) as u8);
        }
        self.acc &= (1u64 << self.pending) - 1;
    }

    /// 完成写入, 末尾不足一字节时用 0 填充
    pub fn finish(mut self) -> Vec<u8> {
        if self.pending > 0 {
            let pad = 8 - self.pending;
            self.data.push((self.acc << pad) as u8);
        }
        self.data
    }
}

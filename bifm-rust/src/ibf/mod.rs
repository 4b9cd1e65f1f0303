//! 交错布隆过滤器（Interleaved Bloom Filter, IBF）。
//!
//! 每个 bin 是一个长度为 `bin_size` 的布隆过滤器；所有 bin 的第 i 位连续存放，
//! 组成宽 `technical_bins`（64 的倍数）的一行。一次查询对每个哈希函数读取同一行的
//! `bin_words` 个字并按位与，就得到所有 bin 的成员关系。
//!
//! 多线程插入时，各线程负责的 bin 必须落在互不重叠的 64 位字内；
//! agent 持有 IBF 的共享借用，因此 `increase_bin_number_to` 期间不可能有存活的 agent。

pub mod agent;
pub mod counting;
pub mod directory;
pub mod sparse;

use std::ops::Range;

use serde::{Deserialize, Serialize};

pub use agent::{CountingAgent, MembershipAgent};
pub use counting::{BinningBitVector, Counter, CountingVector};
pub use directory::{BinningDirectory, DirectoryCountingAgent, IbfConfig, IbfStorage};
pub use sparse::SparseBitVector;

use crate::error::{Error, Result};

/// 各哈希函数的乘法种子。
pub const HASH_SEEDS: [u64; 5] = [
    13_572_355_802_537_770_549, // 2^64 / (e/2)
    13_043_817_825_332_782_213, // 2^64 / sqrt(2)
    10_650_232_656_628_343_401, // 2^64 / sqrt(3)
    16_499_269_484_942_379_435, // 2^64 / (sqrt(5)/2)
    4_893_150_838_803_335_377,  // 2^64 / (3*pi/5)
];

/// 2^64 / 黄金分割比
const GOLDEN_RATIO_MUL: u64 = 11_400_714_819_323_198_485;

pub const MAX_HASH_FUNCTIONS: usize = HASH_SEEDS.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinCount(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinSize(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashFunctionCount(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinIndex(pub usize);

impl Default for HashFunctionCount {
    fn default() -> Self {
        HashFunctionCount(2)
    }
}

/// 布局参数，压缩与非压缩两种形式共用。序列化顺序与字段顺序一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbfLayout {
    bins: usize,
    technical_bins: usize,
    bin_size: usize,
    hash_shift: u32,
    bin_words: usize,
    hash_funs: usize,
}

impl IbfLayout {
    fn new(bins: BinCount, size: BinSize, funs: HashFunctionCount) -> Result<Self> {
        if bins.0 == 0 {
            return Err(Error::invalid_argument("the number of bins must be > 0"));
        }
        if funs.0 == 0 || funs.0 > MAX_HASH_FUNCTIONS {
            return Err(Error::invalid_argument(format!(
                "the number of hash functions must lie in 1..={}, got {}",
                MAX_HASH_FUNCTIONS, funs.0
            )));
        }
        if size.0 == 0 {
            return Err(Error::invalid_argument("the size of a bin must be > 0"));
        }
        let bin_words = bins.0.div_ceil(64);
        Ok(Self {
            bins: bins.0,
            technical_bins: bin_words << 6,
            bin_size: size.0,
            hash_shift: (size.0 as u64).leading_zeros(),
            bin_words,
            hash_funs: funs.0,
        })
    }

    /// 反序列化后检查派生字段
    pub(crate) fn check(&self) -> Result<()> {
        let expected = IbfLayout::new(BinCount(self.bins), BinSize(self.bin_size), HashFunctionCount(self.hash_funs))?;
        if *self != expected {
            return Err(Error::format_mismatch(format!(
                "inconsistent IBF layout: stored {:?}, derived {:?}",
                self, expected
            )));
        }
        Ok(())
    }

    pub fn bin_count(&self) -> usize {
        self.bins
    }

    pub fn bin_size(&self) -> usize {
        self.bin_size
    }

    pub fn hash_function_count(&self) -> usize {
        self.hash_funs
    }

    pub fn bin_words(&self) -> usize {
        self.bin_words
    }

    pub fn technical_bins(&self) -> usize {
        self.technical_bins
    }

    pub fn bit_size(&self) -> usize {
        self.technical_bins * self.bin_size
    }

    /// 把哈希值映射到某一行的起始位（`technical_bins` 的倍数）。
    #[inline]
    pub fn hash_and_fit(&self, h: u64, seed: u64) -> usize {
        debug_assert!(self.hash_shift < 64);
        let mut h = h.wrapping_mul(seed);
        h ^= h >> self.hash_shift;
        h = h.wrapping_mul(GOLDEN_RATIO_MUL);
        let row = ((h as u128 * self.bin_size as u128) >> 64) as usize;
        row * self.technical_bins
    }
}

/// 能回答“从第 `pos` 位起的 64 位”的 IBF 存储。
pub trait BloomWords {
    fn layout(&self) -> &IbfLayout;

    /// `pos` 必须是 64 的倍数
    fn word_at(&self, pos: usize) -> u64;

    fn bin_count(&self) -> usize {
        self.layout().bin_count()
    }

    fn membership_agent(&self) -> MembershipAgent<'_, Self>
    where
        Self: Sized,
    {
        MembershipAgent::new(self)
    }

    fn counting_agent<T: Counter>(&self) -> CountingAgent<'_, Self, T>
    where
        Self: Sized,
    {
        CountingAgent::new(self)
    }
}

/// 可插入、可清除、可扩容的 IBF。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IbfParts")]
pub struct InterleavedBloomFilter {
    layout: IbfLayout,
    data: Vec<u64>,
}

#[derive(Deserialize)]
struct IbfParts {
    layout: IbfLayout,
    data: Vec<u64>,
}

impl TryFrom<IbfParts> for InterleavedBloomFilter {
    type Error = Error;

    fn try_from(parts: IbfParts) -> Result<Self> {
        parts.layout.check()?;
        if parts.data.len() * 64 != parts.layout.bit_size() {
            return Err(Error::format_mismatch(format!(
                "IBF data holds {} words, layout needs {} bits",
                parts.data.len(),
                parts.layout.bit_size()
            )));
        }
        Ok(Self { layout: parts.layout, data: parts.data })
    }
}

impl InterleavedBloomFilter {
    pub fn new(bins: BinCount, size: BinSize, funs: HashFunctionCount) -> Result<Self> {
        let layout = IbfLayout::new(bins, size, funs)?;
        Ok(Self { data: vec![0; layout.bit_size() / 64], layout })
    }

    pub fn bin_size(&self) -> usize {
        self.layout.bin_size
    }

    pub fn hash_function_count(&self) -> usize {
        self.layout.hash_funs
    }

    pub fn bit_size(&self) -> usize {
        self.layout.bit_size()
    }

    #[inline]
    fn set_bit(&mut self, pos: usize) {
        self.data[pos >> 6] |= 1u64 << (pos & 63);
    }

    /// 把 `value` 插入 `bin`。
    pub fn emplace(&mut self, value: u64, bin: BinIndex) {
        debug_assert!(bin.0 < self.layout.bins, "bin index {} out of range", bin.0);
        for &seed in &HASH_SEEDS[..self.layout.hash_funs] {
            let idx = self.layout.hash_and_fit(value, seed) + bin.0;
            self.set_bit(idx);
        }
    }

    /// 清空一个 bin：按 `technical_bins` 步长逐行清零。
    pub fn clear(&mut self, bin: BinIndex) {
        self.clear_bins(bin.0..bin.0 + 1);
    }

    pub fn clear_bins(&mut self, bins: Range<usize>) {
        debug_assert!(bins.end <= self.layout.bins, "bin range {:?} out of range", bins);
        for row in 0..self.layout.bin_size {
            let base = row * self.layout.technical_bins;
            for bin in bins.clone() {
                let pos = base + bin;
                self.data[pos >> 6] &= !(1u64 << (pos & 63));
            }
        }
    }

    /// 增加 bin 数。`bin_words` 不变时只改元数据，否则按新行宽重排到新缓冲区。
    pub fn increase_bin_number_to(&mut self, new_bins: BinCount) -> Result<()> {
        if new_bins.0 < self.layout.bins {
            return Err(Error::invalid_argument(format!(
                "the number of new bins ({}) must be >= the current number of bins ({})",
                new_bins.0, self.layout.bins
            )));
        }
        let new_bin_words = new_bins.0.div_ceil(64);
        self.layout.bins = new_bins.0;
        if new_bin_words == self.layout.bin_words {
            return Ok(());
        }

        let old_words = self.layout.bin_words;
        let mut data = vec![0u64; self.layout.bin_size * new_bin_words];
        for (old_row, new_row) in self.data.chunks_exact(old_words).zip(data.chunks_exact_mut(new_bin_words)) {
            new_row[..old_words].copy_from_slice(old_row);
        }
        self.data = data;
        self.layout.bin_words = new_bin_words;
        self.layout.technical_bins = new_bin_words << 6;
        Ok(())
    }

    pub fn compress(&self) -> CompressedInterleavedBloomFilter {
        CompressedInterleavedBloomFilter::from(self)
    }
}

impl BloomWords for InterleavedBloomFilter {
    fn layout(&self) -> &IbfLayout {
        &self.layout
    }

    #[inline]
    fn word_at(&self, pos: usize) -> u64 {
        debug_assert_eq!(pos & 63, 0);
        self.data[pos >> 6]
    }
}

/// 只读的压缩 IBF，位数据以 Elias–Fano 存储。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedInterleavedBloomFilter {
    layout: IbfLayout,
    data: SparseBitVector,
}

impl From<&InterleavedBloomFilter> for CompressedInterleavedBloomFilter {
    fn from(ibf: &InterleavedBloomFilter) -> Self {
        Self { layout: ibf.layout, data: SparseBitVector::from_words(&ibf.data, ibf.layout.bit_size()) }
    }
}

impl CompressedInterleavedBloomFilter {
    pub fn bin_size(&self) -> usize {
        self.layout.bin_size
    }

    pub fn hash_function_count(&self) -> usize {
        self.layout.hash_funs
    }

    pub fn bit_size(&self) -> usize {
        self.layout.bit_size()
    }
}

impl BloomWords for CompressedInterleavedBloomFilter {
    fn layout(&self) -> &IbfLayout {
        &self.layout
    }

    #[inline]
    fn word_at(&self, pos: usize) -> u64 {
        self.data.get_word(pos)
    }
}

//! Elias–Fano 编码的稀疏位向量，只读。
//!
//! 置位位置 `x` 拆成高位 `x >> low_width` 和低 `low_width` 位：
//! 低位定长打包，高位以一元码写入 `high`（第 i 个元素置位 `high[(x >> low_width) + i]`）。
//! `high` 中每 [`ZERO_SAMPLE`] 个 0 记录一次位置，用于 select0。

use serde::{Deserialize, Serialize};

const ZERO_SAMPLE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseBitVector {
    /// 位向量长度
    len: usize,
    ones: usize,
    low_width: u32,
    low: Vec<u64>,
    high: Vec<u64>,
    high_len: usize,
    zero_samples: Vec<usize>,
}

impl SparseBitVector {
    /// 由普通位向量（按 64 位字存放，共 `len` 位）压缩。
    pub fn from_words(words: &[u64], len: usize) -> Self {
        debug_assert!(words.len() * 64 >= len);
        let ones: usize = words.iter().map(|w| w.count_ones() as usize).sum();
        let low_width = match len.checked_div(ones) {
            Some(ratio) if ratio > 1 => usize::BITS - 1 - ratio.leading_zeros(),
            _ => 0,
        };

        let high_len = ones + (len >> low_width) + 1;
        let mut sv = Self {
            len,
            ones,
            low_width,
            low: vec![0; (ones * low_width as usize).div_ceil(64)],
            high: vec![0; high_len.div_ceil(64)],
            high_len,
            zero_samples: Vec::new(),
        };

        let mut i = 0usize;
        for (wi, &w) in words.iter().enumerate() {
            let mut w = w;
            while w != 0 {
                let x = (wi << 6) + w.trailing_zeros() as usize;
                w &= w - 1;
                sv.set_low(i, x as u64);
                let h = (x >> low_width) + i;
                sv.high[h >> 6] |= 1u64 << (h & 63);
                i += 1;
            }
        }

        let mut zeros = 0usize;
        for pos in 0..high_len {
            if !sv.high_bit(pos) {
                if zeros % ZERO_SAMPLE == 0 {
                    sv.zero_samples.push(pos);
                }
                zeros += 1;
            }
        }
        sv
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn count_ones(&self) -> usize {
        self.ones
    }

    #[inline]
    fn high_bit(&self, pos: usize) -> bool {
        (self.high[pos >> 6] >> (pos & 63)) & 1 == 1
    }

    fn set_low(&mut self, i: usize, x: u64) {
        let w = self.low_width as usize;
        if w == 0 {
            return;
        }
        let v = x & low_mask(self.low_width);
        let bit = i * w;
        let (word, off) = (bit >> 6, bit & 63);
        self.low[word] |= v << off;
        if off + w > 64 {
            self.low[word + 1] |= v >> (64 - off);
        }
    }

    #[inline]
    fn get_low(&self, i: usize) -> u64 {
        let w = self.low_width as usize;
        if w == 0 {
            return 0;
        }
        let bit = i * w;
        let (word, off) = (bit >> 6, bit & 63);
        let mut v = self.low[word] >> off;
        if off + w > 64 {
            v |= self.low[word + 1] << (64 - off);
        }
        v & low_mask(self.low_width)
    }

    /// 第 `j` 个（从 0 计）0 在 `high` 中的位置。
    fn select0(&self, j: usize) -> usize {
        let mut pos = self.zero_samples[j / ZERO_SAMPLE];
        let mut remaining = j % ZERO_SAMPLE;
        loop {
            let word = pos >> 6;
            let mut zeros = !self.high[word] & (!0u64 << (pos & 63));
            let n = zeros.count_ones() as usize;
            if remaining < n {
                for _ in 0..remaining {
                    zeros &= zeros - 1;
                }
                return (word << 6) + zeros.trailing_zeros() as usize;
            }
            remaining -= n;
            pos = (word + 1) << 6;
        }
    }

    /// 读取从 `pos` 开始的 64 位（超出长度的部分为 0）。
    pub fn get_word(&self, pos: usize) -> u64 {
        debug_assert!(pos < self.len);
        if self.ones == 0 {
            return 0;
        }
        let end = pos + 64;
        let bucket = pos >> self.low_width;
        // 高位 >= bucket 的第一个元素
        let mut hp = if bucket == 0 { 0 } else { self.select0(bucket - 1) + 1 };
        let mut idx = hp - bucket;
        let mut h = bucket;
        let mut out = 0u64;

        while hp < self.high_len && idx < self.ones {
            if self.high_bit(hp) {
                let x = (h << self.low_width) | self.get_low(idx) as usize;
                if x >= end {
                    break;
                }
                if x >= pos {
                    out |= 1u64 << (x - pos);
                }
                idx += 1;
            } else {
                h += 1;
                if h << self.low_width >= end {
                    break;
                }
            }
            hp += 1;
        }
        out
    }

    /// 单个位
    pub fn get(&self, pos: usize) -> bool {
        self.get_word(pos) & 1 == 1
    }
}

#[inline]
fn low_mask(width: u32) -> u64 {
    if width >= 64 { u64::MAX } else { (1u64 << width) - 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_word(words: &[u64], len: usize, pos: usize) -> u64 {
        (0..64)
            .filter(|&k| pos + k < len && (words[(pos + k) >> 6] >> ((pos + k) & 63)) & 1 == 1)
            .fold(0u64, |acc, k| acc | (1u64 << k))
    }

    fn lcg_words(n: usize, seed: u64, density_shift: u32) -> Vec<u64> {
        let mut x = seed;
        (0..n)
            .map(|_| {
                let mut w = !0u64;
                for _ in 0..density_shift {
                    x = x.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
                    w &= x;
                }
                w
            })
            .collect()
    }

    #[test]
    fn matches_dense_words_at_every_offset() {
        for (shift, n) in [(1, 3), (3, 40), (6, 200)] {
            let words = lcg_words(n, 42 + shift as u64, shift);
            let len = n * 64 - 5;
            let sv = SparseBitVector::from_words(&words, len);
            for pos in 0..len {
                assert_eq!(sv.get_word(pos), dense_word(&words, len, pos), "shift={} pos={}", shift, pos);
            }
        }
    }

    #[test]
    fn aligned_reads_match_words() {
        let mut words = vec![0u64; 1000];
        words[0] = 1;
        words[17] = 0x8000_0000_0000_0001;
        words[999] = 0xF0;
        let sv = SparseBitVector::from_words(&words, 64_000);
        assert_eq!(sv.count_ones(), 8);
        for (i, &w) in words.iter().enumerate() {
            assert_eq!(sv.get_word(i * 64), w);
        }
        assert!(sv.get(0) && !sv.get(1));
    }

    #[test]
    fn empty_and_full_vectors() {
        let sv = SparseBitVector::from_words(&[0, 0], 128);
        assert_eq!(sv.get_word(64), 0);
        let sv = SparseBitVector::from_words(&[!0, !0], 128);
        assert_eq!(sv.get_word(0), !0);
        assert_eq!(sv.get_word(64), !0);
        assert_eq!(sv.get_word(100), (1u64 << 28) - 1);
    }
}

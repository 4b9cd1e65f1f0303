//! k-mer / minimiser 哈希，供 IBF 按序列插入与计数使用。
//!
//! 输入是 [`dna`](super::dna) 的 rank 序列。含 N 的 k-mer 不产生哈希值，
//! 这样 N 区域不会在所有 bin 上制造假阳性。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::dna::DNA4;

/// minimiser 的默认扰动种子，避免按字典序选出大量 poly-A。
pub const MINIMISER_SEED: u64 = 0x8F3F_73B5_CF1C_9ADE;

/// 64 位整数最多容纳 32 个 2-bit 碱基。
pub const MAX_K: u8 = 32;

#[inline]
fn kmer_mask(k: u8) -> u64 {
    if k >= MAX_K { u64::MAX } else { (1u64 << (2 * k as u32)) - 1 }
}

/// 正向 k-mer 哈希：k-mer 的 4 进制值，按位置顺序产出。
#[derive(Debug, Clone)]
pub struct KmerHashes<'a> {
    seq: &'a [u8],
    k: u8,
    mask: u64,
    pos: usize,
    hash: u64,
    /// 当前 hash 中有效（不含 N）的连续碱基数
    filled: usize,
}

impl<'a> KmerHashes<'a> {
    pub fn new(seq: &'a [u8], k: u8) -> Self {
        debug_assert!(k > 0 && k <= MAX_K, "k must lie in 1..=32");
        Self { seq, k, mask: kmer_mask(k), pos: 0, hash: 0, filled: 0 }
    }
}

impl Iterator for KmerHashes<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        while self.pos < self.seq.len() {
            let r = self.seq[self.pos];
            self.pos += 1;
            if (r as usize) >= DNA4 {
                self.filled = 0;
                self.hash = 0;
                continue;
            }
            self.hash = ((self.hash << 2) | r as u64) & self.mask;
            self.filled += 1;
            if self.filled >= self.k as usize {
                return Some(self.hash);
            }
        }
        None
    }
}

pub fn kmer_hashes(seq: &[u8], k: u8) -> KmerHashes<'_> {
    KmerHashes::new(seq, k)
}

/// 链内所有 canonical k-mer 哈希（正反链取小者）：`(位置, 哈希)`
fn canonical_hashes(seq: &[u8], k: u8) -> Vec<(usize, u64)> {
    let mask = kmer_mask(k);
    let shift = 2 * (k as u32 - 1);
    let mut out = Vec::with_capacity(seq.len());
    let (mut fwd, mut rev, mut filled) = (0u64, 0u64, 0usize);
    for (i, &r) in seq.iter().enumerate() {
        if (r as usize) >= DNA4 {
            fwd = 0;
            rev = 0;
            filled = 0;
            continue;
        }
        fwd = ((fwd << 2) | r as u64) & mask;
        rev = (rev >> 2) | ((3 - r as u64) << shift);
        filled += 1;
        if filled >= k as usize {
            out.push((i + 1 - k as usize, fwd.min(rev)));
        }
    }
    out
}

/// 窗口大小为 `window` 个碱基的 minimiser 序列（相邻重复只输出一次）。
///
/// 窗口跨越 N 时以 N 为界重新开始。
pub fn minimisers(seq: &[u8], k: u8, window: u32) -> Vec<u64> {
    debug_assert!(window as usize >= k as usize, "window must cover at least one k-mer");
    let per_window = window as usize - k as usize + 1;
    let hashes = canonical_hashes(seq, k);

    let mut out = Vec::new();
    let mut deque: VecDeque<(usize, u64)> = VecDeque::new();
    let mut run_start = 0usize; // 当前无 N 片段的第一个 k-mer 起点
    let mut last: Option<(usize, u64)> = None;

    for (idx, &(pos, h)) in hashes.iter().enumerate() {
        if idx > 0 && hashes[idx - 1].0 + 1 != pos {
            deque.clear();
            run_start = pos;
        }
        let h = h ^ MINIMISER_SEED;
        while deque.back().map_or(false, |&(_, b)| b >= h) {
            deque.pop_back();
        }
        deque.push_back((pos, h));
        while deque.front().map_or(false, |&(p, _)| p + per_window <= pos) {
            deque.pop_front();
        }
        if pos + 1 >= run_start + per_window {
            if let Some(&front) = deque.front() {
                if last != Some(front) {
                    if last.map_or(true, |(_, v)| v != front.1) {
                        out.push(front.1);
                    }
                    last = Some(front);
                }
            }
        }
    }
    out
}

/// 从序列产生哈希值的方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashVariant {
    Kmer { k: u8 },
    Minimiser { k: u8, window: u32 },
}

impl Default for HashVariant {
    fn default() -> Self {
        HashVariant::Kmer { k: 5 }
    }
}

impl HashVariant {
    pub fn k(&self) -> u8 {
        match *self {
            HashVariant::Kmer { k } | HashVariant::Minimiser { k, .. } => k,
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        let k = self.k();
        if k == 0 || k > MAX_K {
            return Err(crate::error::Error::invalid_argument(format!(
                "k-mer size must lie in 1..={}, got {}",
                MAX_K, k
            )));
        }
        if let HashVariant::Minimiser { window, .. } = *self {
            if (window as usize) < k as usize {
                return Err(crate::error::Error::invalid_argument(format!(
                    "window size {} is smaller than k-mer size {}",
                    window, k
                )));
            }
        }
        Ok(())
    }

    /// 对每个哈希值调用 `f`，不分配中间结果（k-mer 模式）。
    pub fn for_each_hash(&self, seq: &[u8], mut f: impl FnMut(u64)) {
        match *self {
            HashVariant::Kmer { k } => kmer_hashes(seq, k).for_each(&mut f),
            HashVariant::Minimiser { k, window } => {
                minimisers(seq, k, window).into_iter().for_each(&mut f);
            }
        }
    }

    pub fn hashes(&self, seq: &[u8]) -> Vec<u64> {
        let mut out = Vec::new();
        self.for_each_hash(seq, |h| out.push(h));
        out
    }
}

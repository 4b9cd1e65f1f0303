use serde::{Deserialize, Serialize};

use super::{bwt, sa};

/// 单向 FM 索引（双向索引的一半）。
///
/// - 文本字符在构建时压缩为 `0..sigma` 的连续编码（comp），0 固定是分隔符。
/// - Occ 采用定长分块采样，块内顺扫补偿。
/// - SA 稀疏采样：`SA[row] % sa_sample == 0` 或该行后缀是某条序列的开头
///   （`bwt[row] == 0`）时保留；后者保证 LF 回溯永远不会跨过分隔符。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FmIndex {
    sigma: usize,
    block: usize,
    /// 原始字符 -> comp；非 0 字符映射到 0 表示不存在
    char2comp: Vec<u8>,
    comp2char: Vec<u8>,
    /// C[c] = BWT 中 comp < c 的字符数，长度 sigma + 1
    c: Vec<usize>,
    /// BWT（comp 编码）
    bwt: Vec<u8>,
    /// occ_samples[block_id * sigma + c] = bwt[0..block_id * block) 中 c 的个数
    occ_samples: Vec<u32>,
    sa_sample: usize,
    /// 被采样行的位图与每个 64 位字之前的累计 popcount
    sa_marks: Vec<u64>,
    sa_mark_ranks: Vec<u32>,
    /// 按行序存放的采样 SA 值
    sa_values: Vec<u32>,
}

impl FmIndex {
    /// `text` 中每个字符为 rank + 1，0 是分隔符，且必须以 0 结尾。
    pub fn build(text: &[u8], sa_sample: usize, block: usize) -> Self {
        debug_assert!(text.last() == Some(&0), "text must end with a delimiter");
        let sa_sample = sa_sample.max(1);
        let block = block.max(1);

        let mut present = [false; 256];
        for &ch in text {
            present[ch as usize] = true;
        }
        present[0] = true;
        let comp2char: Vec<u8> = (0..=255u8).filter(|&ch| present[ch as usize]).collect();
        let mut char2comp = vec![0u8; 256];
        for (comp, &ch) in comp2char.iter().enumerate() {
            char2comp[ch as usize] = comp as u8;
        }
        let sigma = comp2char.len();

        let compact: Vec<u8> = text.iter().map(|&ch| char2comp[ch as usize]).collect();
        let sa_arr = sa::build_sa(&compact);
        let bwt_arr = bwt::build_bwt(&compact, &sa_arr);
        let n = bwt_arr.len();

        let mut c = vec![0usize; sigma + 1];
        for &ch in &bwt_arr {
            c[ch as usize + 1] += 1;
        }
        for i in 0..sigma {
            c[i + 1] += c[i];
        }

        let num_blocks = n / block + 1;
        let mut occ_samples = vec![0u32; num_blocks * sigma];
        let mut running = vec![0u32; sigma];
        for (i, &ch) in bwt_arr.iter().enumerate() {
            if i % block == 0 {
                let bi = i / block;
                occ_samples[bi * sigma..(bi + 1) * sigma].copy_from_slice(&running);
            }
            running[ch as usize] += 1;
        }
        if n % block == 0 {
            let bi = n / block;
            occ_samples[bi * sigma..(bi + 1) * sigma].copy_from_slice(&running);
        }

        let words = (n + 63) / 64;
        let mut sa_marks = vec![0u64; words];
        let mut sa_values = Vec::new();
        for (row, &p) in sa_arr.iter().enumerate() {
            if p as usize % sa_sample == 0 || bwt_arr[row] == 0 {
                sa_marks[row / 64] |= 1u64 << (row % 64);
                sa_values.push(p);
            }
        }
        let mut sa_mark_ranks = Vec::with_capacity(words);
        let mut acc = 0u32;
        for &w in &sa_marks {
            sa_mark_ranks.push(acc);
            acc += w.count_ones();
        }

        Self {
            sigma,
            block,
            char2comp,
            comp2char,
            c,
            bwt: bwt_arr,
            occ_samples,
            sa_sample,
            sa_marks,
            sa_mark_ranks,
            sa_values,
        }
    }

    /// 文本长度（含分隔符），即 SA 行数。
    #[inline]
    pub fn size(&self) -> usize {
        self.bwt.len()
    }

    /// 压缩字母表大小（含分隔符）。
    #[inline]
    pub fn sigma(&self) -> usize {
        self.sigma
    }

    #[inline]
    pub fn c(&self, comp: usize) -> usize {
        self.c[comp]
    }

    #[inline]
    pub fn char2comp(&self, ch: u8) -> Option<usize> {
        match self.char2comp[ch as usize] {
            0 if ch != 0 => None,
            comp => Some(comp as usize),
        }
    }

    #[inline]
    pub fn comp2char(&self, comp: usize) -> u8 {
        self.comp2char[comp]
    }

    #[inline]
    fn block_base(&self, pos: usize) -> (usize, usize) {
        let bi = pos / self.block;
        (bi * self.sigma, bi * self.block)
    }

    /// bwt[0..pos) 中 comp 的出现次数
    #[inline]
    pub fn occ(&self, comp: usize, pos: usize) -> usize {
        let (sample, start) = self.block_base(pos);
        let base = self.occ_samples[sample + comp] as usize;
        base + self.bwt[start..pos].iter().filter(|&&ch| ch as usize == comp).count()
    }

    /// bwt[0..pos) 中 comp 严格更小的字符数
    #[inline]
    pub fn less(&self, comp: usize, pos: usize) -> usize {
        let (sample, start) = self.block_base(pos);
        let base: u32 = self.occ_samples[sample..sample + comp].iter().sum();
        base as usize + self.bwt[start..pos].iter().filter(|&&ch| (ch as usize) < comp).count()
    }

    /// 双向扩展所需的三元组，区间为半开 `[lo, hi)`：
    /// `(occ(c, lo), 区间内 < c 的个数, 区间内 > c 的个数)`。
    pub fn lex_count(&self, lo: usize, hi: usize, comp: usize) -> (usize, usize, usize) {
        debug_assert!(lo <= hi && hi <= self.size());
        let rank_lo = self.occ(comp, lo);
        let rank_hi = self.occ(comp, hi);
        let smaller = self.less(comp, hi) - self.less(comp, lo);
        let greater = (hi - lo) - smaller - (rank_hi - rank_lo);
        (rank_lo, smaller, greater)
    }

    #[inline]
    pub fn lf(&self, row: usize) -> usize {
        let comp = self.bwt[row] as usize;
        self.c[comp] + self.occ(comp, row)
    }

    #[inline]
    fn is_sampled(&self, row: usize) -> bool {
        self.sa_marks[row / 64] >> (row % 64) & 1 == 1
    }

    /// 通过 LF 回溯到采样行，恢复 `SA[row]`。
    pub fn locate_row(&self, row: usize) -> usize {
        let mut row = row;
        let mut steps = 0usize;
        while !self.is_sampled(row) {
            row = self.lf(row);
            steps += 1;
        }
        let word = row / 64;
        let below = self.sa_marks[word] & ((1u64 << (row % 64)) - 1);
        let idx = self.sa_mark_ranks[word] as usize + below.count_ones() as usize;
        self.sa_values[idx] as usize + steps
    }

    /// 反向搜索精确匹配，返回半开 SA 区间；`pattern` 为原始字符（rank + 1）。
    pub fn backward_search(&self, pattern: &[u8]) -> Option<(usize, usize)> {
        let (mut l, mut r) = (0usize, self.size());
        for &ch in pattern.iter().rev() {
            let comp = self.char2comp(ch)?;
            l = self.c[comp] + self.occ(comp, l);
            r = self.c[comp] + self.occ(comp, r);
            if l >= r {
                return None;
            }
        }
        Some((l, r))
    }

    pub fn sa_sample_rate(&self) -> usize {
        self.sa_sample
    }
}

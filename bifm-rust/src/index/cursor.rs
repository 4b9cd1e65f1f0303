//! 双向 FM 索引游标：隐式双向后缀树上的一个节点。
//!
//! 游标同时维护正向索引与反向索引上的两个 SA 区间（闭区间），二者长度始终相等。
//! 向左扩展在正向索引上做反向搜索；向右扩展在反向索引上做反向搜索，
//! 另一侧区间由 `lex_count` 给出的“更小 / 更大字符个数”同步修正。
//!
//! 所有扩展、轮换操作失败时返回 `false`，游标保持原状。

use std::fmt;
use std::ops::RangeInclusive;

use super::bi_fm::BiFmIndex;
use super::fm::FmIndex;

#[cfg(debug_assertions)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    None,
    Left,
    Right,
}

/// 在 `fm` 上把闭区间 `[l, r]` 扩展一个字符 `comp`，同时更新镜像区间 `[ml, mr]`。
#[inline]
fn bidirectional_search(
    fm: &FmIndex,
    comp: usize,
    l: usize,
    r: usize,
    ml: usize,
    mr: usize,
) -> Option<(usize, usize, usize, usize)> {
    let c_before = fm.c(comp);
    if r + 1 - l == fm.size() {
        // 根节点：两侧都是 C 表中 comp 的整段
        let width = fm.c(comp + 1) - c_before;
        if width == 0 {
            return None;
        }
        let nr = c_before + width - 1;
        return Some((c_before, nr, c_before, nr));
    }
    let (rank_l, smaller, greater) = fm.lex_count(l, r + 1, comp);
    let width = (r + 1 - l) - smaller - greater;
    if width == 0 {
        return None;
    }
    let nl = c_before + rank_l;
    Some((nl, nl + width - 1, ml + smaller, mr - greater))
}

/// 轮换到兄弟节点：从父区间 `[pl, pr]` 重新扩展 `comp`。
///
/// 兄弟节点在镜像索引中紧跟在前一个兄弟之后，镜像区间从 `prev_mr + 1` 开始。
#[inline]
fn bidirectional_search_cycle(
    fm: &FmIndex,
    comp: usize,
    pl: usize,
    pr: usize,
    prev_mr: usize,
) -> Option<(usize, usize, usize, usize)> {
    let (rank_l, smaller, greater) = fm.lex_count(pl, pr + 1, comp);
    let width = (pr + 1 - pl) - smaller - greater;
    if width == 0 {
        return None;
    }
    let nl = fm.c(comp) + rank_l;
    let nml = prev_mr + 1;
    Some((nl, nl + width - 1, nml, nml + width - 1))
}

#[derive(Clone, Copy)]
pub struct BiFmCursor<'a> {
    index: &'a BiFmIndex,
    fwd_lb: usize,
    fwd_rb: usize,
    rev_lb: usize,
    rev_rb: usize,
    sigma: usize,
    /// 上一次扩展前的区间（扩展方向那一侧的索引）
    parent_lb: usize,
    parent_rb: usize,
    /// 上一次扩展使用的 comp 编码
    last_char: usize,
    depth: usize,
    #[cfg(debug_assertions)]
    last_dir: Direction,
}

impl<'a> BiFmCursor<'a> {
    pub fn new(index: &'a BiFmIndex) -> Self {
        let n = index.size();
        Self {
            index,
            fwd_lb: 0,
            fwd_rb: n - 1,
            rev_lb: 0,
            rev_rb: n - 1,
            sigma: index.fwd().sigma(),
            parent_lb: 0,
            parent_rb: 0,
            last_char: 0,
            depth: 0,
            #[cfg(debug_assertions)]
            last_dir: Direction::None,
        }
    }

    #[inline]
    fn note_direction(&mut self, _right: bool) {
        #[cfg(debug_assertions)]
        {
            self.last_dir = if _right { Direction::Right } else { Direction::Left };
        }
    }

    #[inline]
    fn comp_of_rank(&self, rank: u8) -> Option<usize> {
        let ch = rank.checked_add(1)?;
        self.index.fwd().char2comp(ch)
    }

    #[inline]
    fn try_right(&mut self, comp: usize) -> bool {
        match bidirectional_search(self.index.rev(), comp, self.rev_lb, self.rev_rb, self.fwd_lb, self.fwd_rb) {
            Some((rl, rr, fl, fr)) => {
                self.parent_lb = self.rev_lb;
                self.parent_rb = self.rev_rb;
                self.rev_lb = rl;
                self.rev_rb = rr;
                self.fwd_lb = fl;
                self.fwd_rb = fr;
                self.last_char = comp;
                self.depth += 1;
                true
            }
            None => false,
        }
    }

    #[inline]
    fn try_left(&mut self, comp: usize) -> bool {
        match bidirectional_search(self.index.fwd(), comp, self.fwd_lb, self.fwd_rb, self.rev_lb, self.rev_rb) {
            Some((fl, fr, rl, rr)) => {
                self.parent_lb = self.fwd_lb;
                self.parent_rb = self.fwd_rb;
                self.fwd_lb = fl;
                self.fwd_rb = fr;
                self.rev_lb = rl;
                self.rev_rb = rr;
                self.last_char = comp;
                self.depth += 1;
                true
            }
            None => false,
        }
    }

    /// 以字典序最小、且至少出现一次的字符向右扩展。
    pub fn extend_right(&mut self) -> bool {
        self.note_direction(true);
        (1..self.sigma).any(|comp| self.try_right(comp))
    }

    /// 以字典序最小、且至少出现一次的字符向左扩展。
    pub fn extend_left(&mut self) -> bool {
        self.note_direction(false);
        (1..self.sigma).any(|comp| self.try_left(comp))
    }

    /// 向右扩展指定 rank 的字符。
    pub fn extend_right_by(&mut self, rank: u8) -> bool {
        self.note_direction(true);
        match self.comp_of_rank(rank) {
            Some(comp) => self.try_right(comp),
            None => false,
        }
    }

    /// 向左扩展指定 rank 的字符。
    pub fn extend_left_by(&mut self, rank: u8) -> bool {
        self.note_direction(false);
        match self.comp_of_rank(rank) {
            Some(comp) => self.try_left(comp),
            None => false,
        }
    }

    /// 整段向右扩展；任一字符失败则整体回滚。
    pub fn extend_right_seq(&mut self, seq: &[u8]) -> bool {
        let saved = *self;
        for &rank in seq {
            if !self.extend_right_by(rank) {
                *self = saved;
                return false;
            }
        }
        true
    }

    /// 整段向左扩展（从 `seq` 的最后一个字符开始前插）；任一字符失败则整体回滚。
    pub fn extend_left_seq(&mut self, seq: &[u8]) -> bool {
        let saved = *self;
        for &rank in seq.iter().rev() {
            if !self.extend_left_by(rank) {
                *self = saved;
                return false;
            }
        }
        true
    }

    /// 把最后一次向右扩展的字符替换为下一个更大的可行字符。
    ///
    /// 只能紧跟在 `extend_right*` 之后调用。
    pub fn cycle_back(&mut self) -> bool {
        #[cfg(debug_assertions)]
        debug_assert!(self.last_dir == Direction::Right, "cycle_back() requires a preceding extend_right()");
        debug_assert!(self.depth > 0, "cannot cycle the root");

        for comp in self.last_char + 1..self.sigma {
            if let Some((rl, rr, fl, fr)) =
                bidirectional_search_cycle(self.index.rev(), comp, self.parent_lb, self.parent_rb, self.fwd_rb)
            {
                self.rev_lb = rl;
                self.rev_rb = rr;
                self.fwd_lb = fl;
                self.fwd_rb = fr;
                self.last_char = comp;
                return true;
            }
        }
        false
    }

    /// `cycle_back` 的左侧镜像，只能紧跟在 `extend_left*` 之后调用。
    pub fn cycle_front(&mut self) -> bool {
        #[cfg(debug_assertions)]
        debug_assert!(self.last_dir == Direction::Left, "cycle_front() requires a preceding extend_left()");
        debug_assert!(self.depth > 0, "cannot cycle the root");

        for comp in self.last_char + 1..self.sigma {
            if let Some((fl, fr, rl, rr)) =
                bidirectional_search_cycle(self.index.fwd(), comp, self.parent_lb, self.parent_rb, self.rev_rb)
            {
                self.fwd_lb = fl;
                self.fwd_rb = fr;
                self.rev_lb = rl;
                self.rev_rb = rr;
                self.last_char = comp;
                return true;
            }
        }
        false
    }

    /// 最后一次扩展所用字符的 rank。
    #[inline]
    pub fn last_rank(&self) -> u8 {
        debug_assert!(self.depth > 0, "the root has no last character");
        self.index.fwd().comp2char(self.last_char).wrapping_sub(1)
    }

    #[inline]
    pub fn count(&self) -> usize {
        debug_assert_eq!(self.fwd_rb - self.fwd_lb, self.rev_rb - self.rev_lb);
        self.fwd_rb - self.fwd_lb + 1
    }

    #[inline]
    pub fn query_length(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    pub fn fwd_interval(&self) -> RangeInclusive<usize> {
        self.fwd_lb..=self.fwd_rb
    }

    pub fn rev_interval(&self) -> RangeInclusive<usize> {
        self.rev_lb..=self.rev_rb
    }

    pub fn index(&self) -> &'a BiFmIndex {
        self.index
    }

    /// 所有出现位置 `(序列编号, 序列内偏移)`，按 SA 行序。
    pub fn locate(&self) -> Vec<(usize, usize)> {
        self.lazy_locate().collect()
    }

    /// 惰性 locate：每次 `next()` 才回溯一个 SA 行，可 `clone()` 重新开始。
    pub fn lazy_locate(&self) -> LazyLocate<'a> {
        LazyLocate { index: self.index, rows: self.fwd_lb..self.fwd_rb + 1 }
    }

    /// 当前匹配串（取第一个出现位置在 `texts` 中的切片）。
    pub fn path_label<'t, T: AsRef<[u8]>>(&self, texts: &'t [T]) -> &'t [u8] {
        if self.depth == 0 {
            return &[];
        }
        let p = self.index.fwd().locate_row(self.fwd_lb);
        let (seq, pos) = self.index.to_text_pos(p);
        &texts[seq].as_ref()[pos..pos + self.depth]
    }
}

impl PartialEq for BiFmCursor<'_> {
    /// 同一深度下正向区间相同即为同一节点。
    fn eq(&self, other: &Self) -> bool {
        let same = self.fwd_lb == other.fwd_lb && self.fwd_rb == other.fwd_rb && self.depth == other.depth;
        debug_assert!(!same || (self.rev_lb, self.rev_rb) == (other.rev_lb, other.rev_rb));
        same
    }
}

impl Eq for BiFmCursor<'_> {}

impl fmt::Debug for BiFmCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BiFmCursor")
            .field("fwd", &(self.fwd_lb, self.fwd_rb))
            .field("rev", &(self.rev_lb, self.rev_rb))
            .field("parent", &(self.parent_lb, self.parent_rb))
            .field("last_char", &self.last_char)
            .field("depth", &self.depth)
            .finish()
    }
}

#[derive(Clone)]
pub struct LazyLocate<'a> {
    index: &'a BiFmIndex,
    rows: std::ops::Range<usize>,
}

impl Iterator for LazyLocate<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(self.index.to_text_pos(self.index.fwd().locate_row(row)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for LazyLocate<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::bi_fm::IndexConfig;
    use crate::util::dna::encode;

    fn build(texts: &[&[u8]]) -> BiFmIndex {
        let ranks: Vec<Vec<u8>> = texts.iter().map(|t| encode(t)).collect();
        BiFmIndex::from_texts(&ranks, IndexConfig { sa_sample: 3, occ_block: 4 }).unwrap()
    }

    fn naive_count(texts: &[Vec<u8>], pat: &[u8]) -> usize {
        texts
            .iter()
            .map(|t| if pat.len() > t.len() { 0 } else { t.windows(pat.len()).filter(|w| *w == pat).count() })
            .sum()
    }

    fn lcg_texts(n: usize, len: usize, seed: u32) -> Vec<Vec<u8>> {
        let mut x = seed;
        (0..n)
            .map(|_| {
                (0..len)
                    .map(|_| {
                        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                        ((x >> 16) % 4) as u8
                    })
                    .collect()
            })
            .collect()
    }

    fn assert_sync(c: &BiFmCursor<'_>) {
        assert_eq!(c.fwd_rb - c.fwd_lb, c.rev_rb - c.rev_lb);
        let n = c.index.size();
        assert_eq!(c.depth == 0, c.fwd_interval() == (0..=n - 1) && c.rev_interval() == (0..=n - 1));
    }

    #[test]
    fn extend_right_counts_acgtacgt() {
        let idx = build(&[b"ACGTACGT"]);
        let mut c = idx.cursor();
        assert!(c.extend_right_by(0));
        assert!(c.extend_right_by(1));
        assert_eq!(c.count(), 2);
        assert_eq!(c.query_length(), 2);
        // "A" 后面只跟过 C，没有其他兄弟
        assert!(!c.cycle_back());
        assert_eq!(c.count(), 2);
        assert_eq!(c.last_rank(), 1);
    }

    #[test]
    fn root_children_are_enumerated_in_rank_order() {
        let idx = build(&[b"ACGTACGT"]);
        let mut c = idx.cursor();
        assert!(c.extend_right());
        let mut seen = vec![(c.last_rank(), c.count())];
        while c.cycle_back() {
            seen.push((c.last_rank(), c.count()));
        }
        assert_eq!(seen, vec![(0, 2), (1, 2), (2, 2), (3, 2)]);
    }

    #[test]
    fn left_extension_and_cycle_front() {
        let idx = build(&[b"ACGTACGT"]);
        let mut c = idx.cursor();
        assert!(c.extend_left_seq(&encode(b"GT")));
        assert_eq!(c.count(), 2);
        assert!(c.extend_left());
        assert_eq!(c.last_rank(), 1); // 只有 CGT
        assert_eq!(c.count(), 2);
        assert!(!c.cycle_front());
    }

    #[test]
    fn locate_reports_all_occurrences() {
        let idx = build(&[b"ACGTACGT"]);
        let mut c = idx.cursor();
        assert!(c.extend_right_seq(&encode(b"CG")));
        let mut pos = c.locate();
        pos.sort_unstable();
        assert_eq!(pos, vec![(0, 1), (0, 5)]);
        assert_eq!(c.lazy_locate().len(), 2);
    }

    #[test]
    fn lazy_locate_is_restartable() {
        let idx = build(&[b"ACGTTACG", b"TTACG"]);
        let mut c = idx.cursor();
        assert!(c.extend_left_seq(&encode(b"TAC")));
        let it = c.lazy_locate();
        let first: Vec<_> = it.clone().collect();
        let second: Vec<_> = it.collect();
        assert_eq!(first, second);
        let mut sorted = first;
        sorted.sort_unstable();
        assert_eq!(sorted, vec![(0, 4), (1, 1)]);
    }

    #[test]
    fn failed_sequence_extension_leaves_cursor_untouched() {
        let idx = build(&[b"ACGTACGT"]);
        let mut c = idx.cursor();
        assert!(c.extend_right_by(2));
        let before = c;
        assert!(!c.extend_right_seq(&encode(b"TAA")));
        assert_eq!(
            (c.fwd_lb, c.fwd_rb, c.rev_lb, c.rev_rb, c.depth),
            (before.fwd_lb, before.fwd_rb, before.rev_lb, before.rev_rb, before.depth)
        );
        assert!(!c.extend_left_seq(&encode(b"GGA")));
        assert_eq!(c, before);
    }

    #[test]
    fn unknown_rank_does_not_extend() {
        let idx = build(&[b"AAAA"]);
        let mut c = idx.cursor();
        assert!(!c.extend_right_by(3));
        assert!(!c.extend_left_by(255));
        assert!(c.is_root());
    }

    #[test]
    fn counts_match_naive_in_both_directions() {
        let texts = lcg_texts(3, 30, 99);
        let idx = BiFmIndex::from_texts(&texts, IndexConfig { sa_sample: 4, occ_block: 8 }).unwrap();
        for t in &texts {
            for start in 0..t.len() {
                for len in 1..=6.min(t.len() - start) {
                    let pat = &t[start..start + len];
                    let mut r = idx.cursor();
                    assert!(r.extend_right_seq(pat));
                    assert_sync(&r);
                    assert_eq!(r.count(), naive_count(&texts, pat));

                    let mut l = idx.cursor();
                    assert!(l.extend_left_seq(pat));
                    assert_eq!(l, r);
                }
            }
        }
    }

    #[test]
    fn mixed_directions_reach_the_same_node() {
        let texts = lcg_texts(2, 40, 5);
        let idx = BiFmIndex::from_texts(&texts, IndexConfig::default()).unwrap();
        let pat = &texts[0][10..17];
        let mut a = idx.cursor();
        assert!(a.extend_right_seq(pat));
        // 从中间开始，左右交替
        let mut b = idx.cursor();
        assert!(b.extend_right_seq(&pat[3..5]));
        assert!(b.extend_left_seq(&pat[..3]));
        assert!(b.extend_right_seq(&pat[5..]));
        assert_eq!(a, b);
        assert_eq!(a.rev_interval(), b.rev_interval());
        assert_eq!(a.path_label(&texts), pat);
    }

    #[test]
    fn cycle_back_enumerates_exactly_the_existing_extensions() {
        let texts = lcg_texts(3, 25, 17);
        let idx = BiFmIndex::from_texts(&texts, IndexConfig::default()).unwrap();
        for prefix_len in 0..3 {
            let prefix = &texts[1][4..4 + prefix_len];
            let mut c = idx.cursor();
            assert!(c.extend_right_seq(prefix));
            let mut got = Vec::new();
            if c.extend_right() {
                got.push((c.last_rank(), c.count()));
                assert_sync(&c);
                while c.cycle_back() {
                    assert_sync(&c);
                    got.push((c.last_rank(), c.count()));
                }
            }
            let mut expected = Vec::new();
            for r in 0..4u8 {
                let mut pat = prefix.to_vec();
                pat.push(r);
                let n = naive_count(&texts, &pat);
                if n > 0 {
                    expected.push((r, n));
                }
            }
            assert_eq!(got, expected, "prefix_len={}", prefix_len);
        }
    }

    #[test]
    fn cycle_front_enumerates_exactly_the_existing_extensions() {
        let texts = lcg_texts(2, 30, 23);
        let idx = BiFmIndex::from_texts(&texts, IndexConfig::default()).unwrap();
        let suffix = &texts[0][7..9];
        let mut c = idx.cursor();
        assert!(c.extend_left_seq(suffix));
        let mut got = Vec::new();
        assert!(c.extend_left());
        got.push((c.last_rank(), c.count()));
        while c.cycle_front() {
            got.push((c.last_rank(), c.count()));
        }
        let expected: Vec<(u8, usize)> = (0..4u8)
            .filter_map(|r| {
                let mut pat = vec![r];
                pat.extend_from_slice(suffix);
                let n = naive_count(&texts, &pat);
                (n > 0).then_some((r, n))
            })
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn equality_ignores_parent_context() {
        let idx = build(&[b"ACGTACGT"]);
        let mut a = idx.cursor();
        assert!(a.extend_right_seq(&encode(b"CG")));
        let mut b = idx.cursor();
        assert!(b.extend_left_seq(&encode(b"CG")));
        assert_eq!(a, b);
        assert!(b.extend_left());
        assert_ne!(a, b);
    }
}

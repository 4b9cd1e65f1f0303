//! 搜索方案（search scheme）：把查询切成若干块，每个 search 规定块的处理顺序
//! `pi` 以及处理到第 i 块时累计误差的下界 `l[i]` / 上界 `u[i]`。
//!
//! 误差上限 0..=3 使用预先计算好的最优方案；更大的上限退化为单块的
//! 平凡回溯方案（[`compute_ss`]），这是已知的性能短板而非正确性问题。

use std::borrow::Cow;
use std::sync::OnceLock;

use log::warn;

/// 一个 search。`pi` 从 1 开始编号，`l` / `u` 为累计误差界。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    pub pi: Vec<u8>,
    pub l: Vec<u8>,
    pub u: Vec<u8>,
}

impl Search {
    fn new(pi: &[u8], l: &[u8], u: &[u8]) -> Self {
        debug_assert!(pi.len() == l.len() && l.len() == u.len());
        Self { pi: pi.to_vec(), l: l.to_vec(), u: u.to_vec() }
    }

    pub fn blocks(&self) -> usize {
        self.pi.len()
    }
}

/// 每个 search 的累计块长（按 `pi` 顺序）以及起始位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub blocks_length: Vec<usize>,
    pub start_pos: usize,
}

/// 误差上限为 0..=3 时的最优搜索方案，首次使用时初始化。
fn optimum_table() -> &'static [Vec<Search>; 4] {
    static TABLE: OnceLock<[Vec<Search>; 4]> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            vec![Search::new(&[1], &[0], &[0])],
            vec![
                Search::new(&[1, 2], &[0, 0], &[0, 1]),
                Search::new(&[2, 1], &[0, 1], &[0, 1]),
            ],
            vec![
                Search::new(&[1, 2, 3, 4], &[0, 0, 1, 1], &[0, 0, 2, 2]),
                Search::new(&[3, 2, 1, 4], &[0, 0, 0, 0], &[0, 1, 1, 2]),
                Search::new(&[4, 3, 2, 1], &[0, 0, 0, 2], &[0, 1, 2, 2]),
            ],
            vec![
                Search::new(&[1, 2, 3, 4, 5], &[0, 0, 0, 0, 3], &[0, 2, 2, 3, 3]),
                Search::new(&[2, 3, 4, 5, 1], &[0, 0, 0, 2, 2], &[0, 1, 2, 2, 3]),
                Search::new(&[3, 4, 5, 2, 1], &[0, 0, 1, 1, 1], &[0, 1, 1, 2, 3]),
                Search::new(&[5, 4, 3, 2, 1], &[0, 0, 0, 0, 0], &[0, 0, 3, 3, 3]),
            ],
        ]
    })
}

/// 预计算的最优方案（只覆盖 `0..=max_error`，最小误差为 0）。
pub fn optimum_search_scheme(max_error: u8) -> Option<&'static [Search]> {
    optimum_table().get(max_error as usize).map(Vec::as_slice)
}

/// 非最优方案：单块、误差界 `[min_error, max_error]`，等价于平凡回溯。
pub fn compute_ss(min_error: u8, max_error: u8) -> Vec<Search> {
    vec![Search::new(&[1], &[min_error], &[max_error])]
}

/// 按总误差选择方案；超出预计算范围时回退到 [`compute_ss`]。
pub fn scheme_for(max_error: u8) -> Cow<'static, [Search]> {
    match optimum_search_scheme(max_error) {
        Some(s) => Cow::Borrowed(s),
        None => {
            warn!("no optimum search scheme for {} errors, falling back to trivial backtracking", max_error);
            Cow::Owned(compute_ss(0, max_error))
        }
    }
}

/// 计算各 search 的累计块长与起始位置。
///
/// 查询均分为 `blocks` 块，前 `len % blocks` 块各多一个字符。
pub fn search_scheme_block_info(scheme: &[Search], query_len: usize) -> Vec<BlockInfo> {
    let blocks = scheme.first().map_or(1, Search::blocks);
    let base = query_len / blocks;
    let rest = query_len % blocks;
    let block_len = |b: u8| base + usize::from((b as usize - 1) < rest);

    scheme
        .iter()
        .map(|search| {
            let mut blocks_length = Vec::with_capacity(blocks);
            let mut acc = 0usize;
            let mut start_pos = 0usize;
            for (i, &b) in search.pi.iter().enumerate() {
                let len = block_len(b);
                acc += len;
                blocks_length.push(acc);
                if i > 0 && b < search.pi[0] {
                    start_pos += len;
                }
            }
            BlockInfo { blocks_length, start_pos }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 所有误差分布中，被 scheme 中多少个 search 接受。
    fn acceptance(scheme: &[Search], dist: &[u8]) -> usize {
        scheme
            .iter()
            .filter(|s| {
                let mut acc = 0u8;
                s.pi.iter().enumerate().all(|(i, &b)| {
                    acc += dist[b as usize - 1];
                    s.l[i] <= acc && acc <= s.u[i]
                })
            })
            .count()
    }

    fn distributions(blocks: usize, max: u8) -> Vec<Vec<u8>> {
        let mut out = vec![vec![]];
        for _ in 0..blocks {
            out = out
                .into_iter()
                .flat_map(|d| {
                    (0..=max).map(move |e| {
                        let mut d = d.clone();
                        d.push(e);
                        d
                    })
                })
                .collect();
        }
        out.into_iter().filter(|d| d.iter().sum::<u8>() <= max).collect()
    }

    #[test]
    fn optimum_schemes_cover_every_distribution_exactly_once() {
        for k in 0..=3u8 {
            let scheme = optimum_search_scheme(k).unwrap();
            let blocks = scheme[0].blocks();
            for dist in distributions(blocks, k) {
                assert_eq!(acceptance(scheme, &dist), 1, "k={} dist={:?}", k, dist);
            }
        }
    }

    #[test]
    fn every_search_is_a_connected_permutation() {
        for k in 0..=3u8 {
            for s in optimum_search_scheme(k).unwrap() {
                let mut sorted = s.pi.clone();
                sorted.sort_unstable();
                assert_eq!(sorted, (1..=s.blocks() as u8).collect::<Vec<_>>());
                // 已处理的块始终是连续区间
                for i in 1..=s.blocks() {
                    let lo = *s.pi[..i].iter().min().unwrap();
                    let hi = *s.pi[..i].iter().max().unwrap();
                    assert_eq!((hi - lo + 1) as usize, i);
                }
                assert!(s.l.windows(2).all(|w| w[0] <= w[1]));
                assert!(s.u.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }

    #[test]
    fn fallback_is_single_trivial_search() {
        assert!(optimum_search_scheme(4).is_none());
        let s = scheme_for(5);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0], Search { pi: vec![1], l: vec![0], u: vec![5] });
        assert_eq!(compute_ss(2, 6)[0].l, vec![2]);
    }

    #[test]
    fn block_info_for_two_errors() {
        let info = search_scheme_block_info(optimum_search_scheme(2).unwrap(), 10);
        // 块长 3 3 2 2
        assert_eq!(info[0], BlockInfo { blocks_length: vec![3, 6, 8, 10], start_pos: 0 });
        assert_eq!(info[1], BlockInfo { blocks_length: vec![2, 5, 8, 10], start_pos: 6 });
        assert_eq!(info[2], BlockInfo { blocks_length: vec![2, 4, 7, 10], start_pos: 8 });
    }

    #[test]
    fn block_info_single_block() {
        let info = search_scheme_block_info(optimum_search_scheme(0).unwrap(), 7);
        assert_eq!(info, vec![BlockInfo { blocks_length: vec![7], start_pos: 0 }]);
    }
}

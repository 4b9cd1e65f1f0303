//! 基于搜索方案的近似匹配（替换 / 插入 / 删除）。
//!
//! 查询区间用开区间 `(lb, rb)` 表示，查询第一个字符的下标为 1：
//! 已匹配部分是 `query[lb..rb - 1]`。每个 search 从起始块的第一个字符开始，
//! 按 `pi` 的顺序左右交替扩展游标，块边界处检查累计误差是否落在 `[l, u]` 内。
//!
//! `ABORT` 为真时，第一次命中后整棵回溯树立即返回（单个最优 / strata 的探测阶段）。
//! 是否中止在编译期单态化，递归内部不再判断命中策略。

use log::trace;

use super::config::{HitStrategy, MaxError, SearchConfig, SearchParam};
use super::result::SearchResult;
use super::scheme::{scheme_for, search_scheme_block_info, Search};
use super::trivial::search_trivial;
use crate::error::Result;
use crate::index::{BiFmCursor, BiFmIndex};

/// 单个 search 的只读上下文与命中回调。
struct SchemeWalk<'s, F> {
    query: &'s [u8],
    search: &'s Search,
    blocks_length: &'s [usize],
    delegate: &'s mut F,
}

impl<'a, 's, F> SchemeWalk<'s, F>
where
    F: FnMut(&BiFmCursor<'a>),
{
    #[inline]
    fn next_block(&self, block_id: usize) -> (usize, bool) {
        let b2 = (block_id + 1).min(self.search.blocks() - 1);
        let go_right2 = b2 == 0 || self.search.pi[b2] > self.search.pi[b2 - 1];
        (b2, go_right2)
    }

    /// 误差界：`(本块最多还能用, 本块至少还要用)`
    #[inline]
    fn block_bounds(&self, block_id: usize, spent: u8) -> (i32, i32) {
        let max_left = self.search.u[block_id] as i32 - spent as i32;
        let min_left = (self.search.l[block_id] as i32 - spent as i32).max(0);
        (max_left, min_left)
    }

    fn search_ss<const ABORT: bool>(
        &mut self,
        cur: BiFmCursor<'a>,
        lb: usize,
        rb: usize,
        spent: u8,
        block_id: usize,
        go_right: bool,
        error_left: SearchParam,
    ) -> bool {
        let m = self.query.len();
        let (max_left, min_left) = self.block_bounds(block_id, spent);
        let consumed = rb - lb - 1;

        if min_left == 0 && lb == 0 && rb == m + 1 {
            (self.delegate)(&cur);
            return true;
        }
        // 查询已读完但最后一块的下界没满足
        if consumed == m {
            return false;
        }

        if (max_left == 0 && consumed != self.blocks_length[block_id]) || (error_left.total == 0 && min_left == 0) {
            return self.search_ss_exact::<ABORT>(cur, lb, rb, spent, block_id, go_right, error_left);
        }

        if error_left.total > 0 {
            if error_left.insertion > 0 {
                let (lb2, rb2) = if go_right { (lb, rb + 1) } else { (lb - 1, rb) };
                let mut e2 = error_left;
                e2.total -= 1;
                e2.insertion -= 1;

                // 插入恰好用完本块最后一个字符
                let hit = if rb - lb == self.blocks_length[block_id] {
                    self.search_ss_deletion::<ABORT>(cur, lb2, rb2, spent + 1, block_id, go_right, e2)
                } else {
                    self.search_ss::<ABORT>(cur, lb2, rb2, spent + 1, block_id, go_right, e2)
                };
                if ABORT && hit {
                    return true;
                }
            }
            if self.search_ss_children::<ABORT>(cur, lb, rb, spent, block_id, go_right, min_left, error_left) && ABORT
            {
                return true;
            }
        }
        false
    }

    /// 本块剩余部分精确匹配：一次批量扩展，然后进入下一块。
    fn search_ss_exact<const ABORT: bool>(
        &mut self,
        mut cur: BiFmCursor<'a>,
        lb: usize,
        rb: usize,
        spent: u8,
        block_id: usize,
        go_right: bool,
        error_left: SearchParam,
    ) -> bool {
        let blocks = self.search.blocks();
        let block_id2 = (block_id + 1).min(blocks - 1);
        let go_right2 = block_id < blocks - 1 && self.search.pi[block_id + 1] > self.search.pi[block_id];
        let block_len = self.blocks_length[block_id];

        if go_right {
            // 查询下标 [rb - 1, lb + block_len - 1)
            let end = lb + block_len;
            if !cur.extend_right_seq(&self.query[rb - 1..end]) {
                return false;
            }
            self.search_ss::<ABORT>(cur, lb, end + 1, spent, block_id2, go_right2, error_left) && ABORT
        } else {
            let start = rb - block_len - 1;
            if !cur.extend_left_seq(&self.query[start..lb]) {
                return false;
            }
            self.search_ss::<ABORT>(cur, start, rb, spent, block_id2, go_right2, error_left) && ABORT
        }
    }

    /// 块边界上的删除：文本多出的字符不消耗查询字符，需要枚举所有可能字符。
    fn search_ss_deletion<const ABORT: bool>(
        &mut self,
        cur: BiFmCursor<'a>,
        lb: usize,
        rb: usize,
        spent: u8,
        block_id: usize,
        go_right: bool,
        error_left: SearchParam,
    ) -> bool {
        let blocks = self.search.blocks();
        let (max_left, min_left) = self.block_bounds(block_id, spent);

        if min_left == 0 {
            let (block_id2, go_right2) = self.next_block(block_id);
            if self.search_ss::<ABORT>(cur, lb, rb, spent, block_id2, go_right2, error_left) && ABORT {
                return true;
            }
        }

        // 查询两端不允许删除
        let at_query_end = (self.search.pi[block_id] == 1 && !go_right)
            || (self.search.pi[block_id] as usize == blocks && go_right);
        if !at_query_end && max_left > 0 && error_left.total > 0 && error_left.deletion > 0 {
            let mut e2 = error_left;
            e2.total -= 1;
            e2.deletion -= 1;
            let mut child = cur;
            let extended = if go_right { child.extend_right() } else { child.extend_left() };
            if extended {
                loop {
                    if self.search_ss_deletion::<ABORT>(child, lb, rb, spent + 1, block_id, go_right, e2) && ABORT {
                        return true;
                    }
                    let cycled = if go_right { child.cycle_back() } else { child.cycle_front() };
                    if !cycled {
                        break;
                    }
                }
            }
        }
        false
    }

    /// 枚举当前节点的每个子节点：匹配 / 替换推进查询，另外尝试删除。
    fn search_ss_children<const ABORT: bool>(
        &mut self,
        cur: BiFmCursor<'a>,
        lb: usize,
        rb: usize,
        spent: u8,
        block_id: usize,
        go_right: bool,
        min_left: i32,
        error_left: SearchParam,
    ) -> bool {
        let m = self.query.len();
        let mut child = cur;
        let extended = if go_right { child.extend_right() } else { child.extend_left() };
        if !extended {
            return false;
        }

        let block_len = self.blocks_length[block_id];
        let chars_left = block_len as i32 - (rb - lb - 1) as i32;
        let (lb2, rb2) = if go_right { (lb, rb + 1) } else { (lb - 1, rb) };
        let expected = if go_right { self.query[rb - 1] } else { self.query[lb - 1] };
        let deletion_allowed_here =
            !(go_right && (rb == 1 || rb == m + 1)) && !(!go_right && (lb == 0 || lb == m));

        loop {
            let delta = u8::from(child.last_rank() != expected);

            // 剩余字符不够凑满本块的最小误差
            let skip = error_left.deletion == 0 && chars_left + (delta as i32) < min_left + 1;
            if !skip {
                if delta == 0 || error_left.substitution > 0 {
                    let mut e2 = error_left;
                    e2.total -= delta;
                    e2.substitution -= delta;

                    let hit = if rb - lb == block_len {
                        if error_left.deletion > 0 {
                            self.search_ss_deletion::<ABORT>(child, lb2, rb2, spent + delta, block_id, go_right, e2)
                        } else {
                            let (block_id2, go_right2) = self.next_block(block_id);
                            self.search_ss::<ABORT>(child, lb2, rb2, spent + delta, block_id2, go_right2, e2)
                        }
                    } else {
                        self.search_ss::<ABORT>(child, lb2, rb2, spent + delta, block_id, go_right, e2)
                    };
                    if ABORT && hit {
                        return true;
                    }
                }

                if error_left.deletion > 0 && deletion_allowed_here {
                    let mut e3 = error_left;
                    e3.total -= 1;
                    e3.deletion -= 1;
                    if self.search_ss::<ABORT>(child, lb, rb, spent + 1, block_id, go_right, e3) && ABORT {
                        return true;
                    }
                }
            }

            let cycled = if go_right { child.cycle_back() } else { child.cycle_front() };
            if !cycled {
                break;
            }
        }
        false
    }
}

/// 用给定方案检索一条查询；`ABORT` 时首个命中后停止。
pub fn search_ss<'a, const ABORT: bool, F>(
    index: &'a BiFmIndex,
    query: &[u8],
    error_left: SearchParam,
    scheme: &[Search],
    delegate: &mut F,
) -> bool
where
    F: FnMut(&BiFmCursor<'a>),
{
    let block_info = search_scheme_block_info(scheme, query.len());
    for (search, info) in scheme.iter().zip(&block_info) {
        let mut walk = SchemeWalk { query, search, blocks_length: &info.blocks_length, delegate: &mut *delegate };
        let hit = walk.search_ss::<ABORT>(
            index.cursor(),
            info.start_pos,
            info.start_pos + 1,
            0,
            0,
            true,
            error_left,
        );
        if ABORT && hit {
            return true;
        }
    }
    false
}

/// 按总误差选方案并检索。查询比方案的块数还短时改用平凡回溯。
pub fn search_algo_bi<'a, const ABORT: bool, F>(
    index: &'a BiFmIndex,
    query: &[u8],
    error_left: SearchParam,
    delegate: &mut F,
) -> bool
where
    F: FnMut(&BiFmCursor<'a>),
{
    let scheme = scheme_for(error_left.total);
    if query.len() < scheme[0].blocks() {
        return search_trivial::<ABORT, F>(index, query, error_left, delegate);
    }
    search_ss::<ABORT, F>(index, query, error_left, &scheme, delegate)
}

/// 搜索方案驱动的双向索引近似检索。
#[derive(Debug, Clone, Copy)]
pub struct SearchSchemeAlgorithm<'a> {
    index: &'a BiFmIndex,
    max_error: MaxError,
    hit: HitStrategy,
}

impl<'a> SearchSchemeAlgorithm<'a> {
    /// 配置在这里校验一次，之后的检索不再返回错误。
    pub fn new(index: &'a BiFmIndex, config: &SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { index, max_error: config.max_error, hit: config.hit })
    }

    /// 该查询实际使用的误差预算：任何一项都不超过 `len - 1`，
    /// 保证命中至少对齐到一个文本字符。
    fn max_error_counts(&self, query: &[u8]) -> SearchParam {
        self.max_error.resolve(query.len()).capped(query.len().saturating_sub(1).min(u8::MAX as usize) as u8)
    }

    /// 检索一条查询，每个（去重后的）出现位置调用一次 `callback`。
    pub fn run<C>(&self, query_id: usize, query: &[u8], mut callback: C)
    where
        C: FnMut(SearchResult),
    {
        if query.is_empty() {
            return;
        }
        let error_state = self.max_error_counts(query);
        let hits = self.perform_search_by_hit_strategy(query, error_state);
        trace!("query {}: {} hit nodes", query_id, hits.len());
        self.make_results(hits, query_id, &mut callback);
    }

    fn perform_search_by_hit_strategy(&self, query: &[u8], mut error_state: SearchParam) -> Vec<BiFmCursor<'a>> {
        let mut internal_hits: Vec<BiFmCursor<'a>> = Vec::new();

        match self.hit {
            HitStrategy::All => {
                search_algo_bi::<false, _>(self.index, query, error_state, &mut |c| internal_hits.push(*c));
            }
            HitStrategy::Best | HitStrategy::AllBest | HitStrategy::Strata(_) => {
                // 误差从 0 逐层放宽，直到出现命中
                let max_total = error_state.total;
                error_state.total = 0;
                loop {
                    if self.hit == HitStrategy::AllBest {
                        search_algo_bi::<false, _>(self.index, query, error_state, &mut |c| internal_hits.push(*c));
                    } else {
                        search_algo_bi::<true, _>(self.index, query, error_state, &mut |c| internal_hits.push(*c));
                    }
                    if !internal_hits.is_empty() || error_state.total >= max_total {
                        break;
                    }
                    error_state.total += 1;
                }

                if let HitStrategy::Strata(stratum) = self.hit {
                    if !internal_hits.is_empty() {
                        // 丢弃探测结果，按 best + stratum 重跑一次
                        let best = error_state.total;
                        error_state.total = best.saturating_add(stratum).min(max_total);
                        internal_hits.clear();
                        search_algo_bi::<false, _>(self.index, query, error_state, &mut |c| internal_hits.push(*c));
                    }
                }
            }
        }
        internal_hits
    }

    fn make_results<C>(&self, hits: Vec<BiFmCursor<'a>>, query_id: usize, callback: &mut C)
    where
        C: FnMut(SearchResult),
    {
        let to_result = |(reference_id, reference_begin): (usize, usize)| SearchResult {
            query_id,
            reference_id,
            reference_begin,
        };
        if self.hit == HitStrategy::Best {
            if let Some(pos) = hits.first().and_then(|c| c.lazy_locate().next()) {
                callback(to_result(pos));
            }
            return;
        }
        let mut positions: Vec<(usize, usize)> = hits.iter().flat_map(BiFmCursor::lazy_locate).collect();
        positions.sort_unstable();
        positions.dedup();
        positions.into_iter().map(to_result).for_each(callback);
    }
}

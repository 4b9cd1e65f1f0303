//! 平凡回溯：只向右扩展，逐个查询字符尝试匹配 / 替换 / 插入 / 删除。
//!
//! 误差上限超出预计算方案、或查询短于方案块数时使用。

use super::config::SearchParam;
use crate::index::{BiFmCursor, BiFmIndex};

fn trivial_step<'a, const ABORT: bool, F>(
    cur: BiFmCursor<'a>,
    query: &[u8],
    pos: usize,
    error_left: SearchParam,
    delegate: &mut F,
) -> bool
where
    F: FnMut(&BiFmCursor<'a>),
{
    let m = query.len();

    // 预算用完：剩余部分只能精确匹配
    if pos == m || error_left.total == 0 {
        let mut c = cur;
        if pos == m || c.extend_right_seq(&query[pos..]) {
            delegate(&c);
            return true;
        }
        return false;
    }

    // 插入：跳过一个查询字符
    if error_left.insertion > 0 {
        let mut e2 = error_left;
        e2.total -= 1;
        e2.insertion -= 1;
        if trivial_step::<ABORT, F>(cur, query, pos + 1, e2, delegate) && ABORT {
            return true;
        }
    }

    let may_branch = (pos > 0 && error_left.deletion > 0) || error_left.substitution > 0;
    let mut child = cur;
    if may_branch && child.extend_right() {
        loop {
            let delta = u8::from(child.last_rank() != query[pos]);
            if error_left.substitution > 0 {
                let mut e2 = error_left;
                e2.total -= delta;
                e2.substitution -= delta;
                if trivial_step::<ABORT, F>(child, query, pos + 1, e2, delegate) && ABORT {
                    return true;
                }
            }
            // 开头不做删除
            if pos > 0 {
                if error_left.substitution == 0
                    && delta == 0
                    && trivial_step::<ABORT, F>(child, query, pos + 1, error_left, delegate)
                    && ABORT
                {
                    return true;
                }
                if error_left.deletion > 0 {
                    let mut e2 = error_left;
                    e2.total -= 1;
                    e2.deletion -= 1;
                    if trivial_step::<ABORT, F>(child, query, pos, e2, delegate) && ABORT {
                        return true;
                    }
                }
            }
            if !child.cycle_back() {
                break;
            }
        }
    } else {
        let mut c = cur;
        if c.extend_right_by(query[pos]) && trivial_step::<ABORT, F>(c, query, pos + 1, error_left, delegate) && ABORT
        {
            return true;
        }
    }
    false
}

/// 从根开始做平凡回溯；`ABORT` 时首个命中后停止。
pub fn search_trivial<'a, const ABORT: bool, F>(
    index: &'a BiFmIndex,
    query: &[u8],
    error_left: SearchParam,
    delegate: &mut F,
) -> bool
where
    F: FnMut(&BiFmCursor<'a>),
{
    trivial_step::<ABORT, F>(index.cursor(), query, 0, error_left, delegate)
}

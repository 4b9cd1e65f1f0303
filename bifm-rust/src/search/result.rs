use std::fmt;

use serde::Serialize;

/// 一次检索得到的一个出现位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SearchResult {
    pub query_id: usize,
    pub reference_id: usize,
    /// 参考序列内的起始偏移（0-based）
    pub reference_begin: usize,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<query_id:{}, reference_id:{}, reference_pos:{}>", self.query_id, self.reference_id, self.reference_begin)
    }
}

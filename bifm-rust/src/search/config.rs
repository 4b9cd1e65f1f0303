use crate::error::{Error, Result};

/// 剩余误差预算。检索下降时逐项递减，任何一项不能减到负数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchParam {
    pub total: u8,
    pub substitution: u8,
    pub insertion: u8,
    pub deletion: u8,
}

impl SearchParam {
    pub fn uniform(e: u8) -> Self {
        Self { total: e, substitution: e, insertion: e, deletion: e }
    }

    /// 每一项都不超过 `cap`
    pub fn capped(self, cap: u8) -> Self {
        Self {
            total: self.total.min(cap),
            substitution: self.substitution.min(cap),
            insertion: self.insertion.min(cap),
            deletion: self.deletion.min(cap),
        }
    }
}

/// 误差上限：绝对个数或相对查询长度的比例。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxError {
    Count {
        total: Option<u8>,
        substitution: Option<u8>,
        insertion: Option<u8>,
        deletion: Option<u8>,
    },
    Rate {
        total: Option<f64>,
        substitution: Option<f64>,
        insertion: Option<f64>,
        deletion: Option<f64>,
    },
}

impl Default for MaxError {
    fn default() -> Self {
        MaxError::Count { total: None, substitution: None, insertion: None, deletion: None }
    }
}

impl MaxError {
    pub fn total(e: u8) -> Self {
        MaxError::Count { total: Some(e), substitution: None, insertion: None, deletion: None }
    }

    pub fn total_rate(rate: f64) -> Self {
        MaxError::Rate { total: Some(rate), substitution: None, insertion: None, deletion: None }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            MaxError::Count { total, substitution, insertion, deletion } => {
                if let Some(t) = total {
                    for (name, v) in [("substitution", substitution), ("insertion", insertion), ("deletion", deletion)] {
                        if let Some(v) = v.filter(|&v| v > t) {
                            return Err(Error::invalid_config(format!(
                                "{} errors ({}) exceed the total number of errors ({})",
                                name, v, t
                            )));
                        }
                    }
                }
            }
            MaxError::Rate { total, substitution, insertion, deletion } => {
                for (name, v) in
                    [("total", total), ("substitution", substitution), ("insertion", insertion), ("deletion", deletion)]
                {
                    if let Some(v) = v.filter(|v| !(0.0..=1.0).contains(v)) {
                        return Err(Error::invalid_config(format!("{} error rate {} is outside [0, 1]", name, v)));
                    }
                }
                if let Some(t) = total {
                    for (name, v) in [("substitution", substitution), ("insertion", insertion), ("deletion", deletion)] {
                        if let Some(v) = v.filter(|&v| v > t) {
                            return Err(Error::invalid_config(format!(
                                "{} error rate ({}) exceeds the total error rate ({})",
                                name, v, t
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// 针对长度为 `query_len` 的查询解析出具体预算。
    ///
    /// - 只给 total：各类误差都取 total；
    /// - 只给分项：未给的分项为 0，total 取分项之和；
    /// - 比例按 `floor(rate * len)` 取整。
    pub fn resolve(&self, query_len: usize) -> SearchParam {
        let (total, parts) = match *self {
            MaxError::Count { total, substitution, insertion, deletion } => (total, [substitution, insertion, deletion]),
            MaxError::Rate { total, substitution, insertion, deletion } => {
                let abs = |r: Option<f64>| r.map(|r| (r * query_len as f64).floor().min(u8::MAX as f64) as u8);
                (abs(total), [abs(substitution), abs(insertion), abs(deletion)])
            }
        };
        match total {
            Some(t) if parts.iter().all(Option::is_none) => SearchParam::uniform(t),
            Some(t) => SearchParam {
                total: t,
                substitution: parts[0].unwrap_or(0),
                insertion: parts[1].unwrap_or(0),
                deletion: parts[2].unwrap_or(0),
            },
            None => {
                let [s, i, d] = parts.map(|p| p.unwrap_or(0));
                SearchParam { total: s.saturating_add(i).saturating_add(d), substitution: s, insertion: i, deletion: d }
            }
        }
    }
}

/// 命中报告策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitStrategy {
    /// 误差预算内的全部命中
    #[default]
    All,
    /// 最小误差层上的全部命中
    AllBest,
    /// 任意一个最小误差命中
    Best,
    /// 最小误差 + stratum 以内的全部命中
    Strata(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SearchConfig {
    pub max_error: MaxError,
    pub hit: HitStrategy,
    /// 批量检索的线程数，0 或 1 表示串行
    pub threads: usize,
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_error(mut self, max_error: MaxError) -> Self {
        self.max_error = max_error;
        self
    }

    pub fn hit(mut self, hit: HitStrategy) -> Self {
        self.hit = hit;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.max_error.validate()
    }
}

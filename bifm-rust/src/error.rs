//! 库内统一错误类型。
//!
//! 检索热路径（`extend_*`、`cycle_*`、`bulk_contains`）不返回错误，
//! 前置条件只在 debug 构建中以断言检查；这里只覆盖构造期与 I/O 失败。

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// 检索配置非法（误差上限、误差率、策略参数）
    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),

    /// 构造参数非法（IBF 的 bin 数量 / 大小 / 哈希函数个数等）
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// 没有任何可索引的字符
    #[error("cannot build an index over an empty text")]
    EmptyText,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// FASTA / FASTQ 输入格式错误
    #[error("malformed sequence input: {0}")]
    MalformedInput(String),

    /// 读入的文件与当前结构不匹配（magic、版本、布局）
    #[error("format mismatch: {0}")]
    FormatMismatch(String),
}

impl Error {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn malformed_input(msg: impl Into<String>) -> Self {
        Error::MalformedInput(msg.into())
    }

    pub fn format_mismatch(msg: impl Into<String>) -> Self {
        Error::FormatMismatch(msg.into())
    }
}

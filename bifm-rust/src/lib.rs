//! # bifm-rust
//!
//! 双向 FM 索引上的近似检索，以及用于按 bin 预过滤的交错布隆过滤器。
//!
//! - **双向索引**：正向文本与逐条反转文本各建一个 FM 索引，游标可左右扩展
//! - **搜索方案**：按块分配误差上下界的回溯检索，支持替换 / 插入 / 删除
//! - **命中策略**：全部命中、全部最优、单个最优、strata
//! - **IBF**：所有 bin 的布隆过滤器按位交错存放，一次批量访存回答全部 bin
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use bifm_rust::index::{BiFmIndex, IndexConfig};
//! use bifm_rust::search::{search, HitStrategy, MaxError, SearchConfig};
//! use bifm_rust::util::dna;
//!
//! let reference = dna::encode(b"ACGTACGTAGCTGATCGTAG");
//! let index = BiFmIndex::from_texts(&[reference], IndexConfig::default()).unwrap();
//!
//! let queries = vec![dna::encode(b"GCTGTTC")];
//! let config = SearchConfig::new().max_error(MaxError::total(1)).hit(HitStrategy::AllBest);
//! for hit in search(&index, &queries, &config).unwrap() {
//!     println!("{}", hit);
//! }
//! ```
//!
//! ## 模块说明
//!
//! - [`index`] — 后缀数组、BWT、FM 索引、双向索引与游标
//! - [`search`] — 搜索方案、平凡回溯、命中策略
//! - [`ibf`] — 交错布隆过滤器、压缩形式、计数与分 bin 目录
//! - [`io`] — FASTA / FASTQ 文件解析
//! - [`util`] — DNA 编码、k-mer / minimiser 哈希
//! - [`error`] — 错误类型

pub mod error;
pub mod ibf;
pub mod index;
pub mod io;
pub mod search;
pub mod util;

pub use error::{Error, Result};

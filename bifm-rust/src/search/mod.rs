//! 双向 FM 索引上的近似检索。
//!
//! - [`config`]：误差上限与命中策略
//! - [`scheme`]：搜索方案表
//! - [`scheme_algorithm`]：按方案回溯
//! - [`trivial`]：单向平凡回溯（误差上限较大时的退路）

pub mod config;
pub mod result;
pub mod scheme;
pub mod scheme_algorithm;
pub mod trivial;

use log::debug;
use rayon::prelude::*;

pub use config::{HitStrategy, MaxError, SearchConfig, SearchParam};
pub use result::SearchResult;
pub use scheme_algorithm::SearchSchemeAlgorithm;

use crate::error::{Error, Result};
use crate::index::BiFmIndex;

/// 检索单条（rank 编码的）查询。
pub fn search_one(index: &BiFmIndex, query: &[u8], config: &SearchConfig) -> Result<Vec<SearchResult>> {
    let algo = SearchSchemeAlgorithm::new(index, config)?;
    let mut out = Vec::new();
    algo.run(0, query, |r| out.push(r));
    Ok(out)
}

/// 批量检索，结果按查询顺序排列，`query_id` 为查询在 `queries` 中的下标。
///
/// `config.threads > 1` 时在局部 rayon 线程池中并行。
pub fn search<Q>(index: &BiFmIndex, queries: &[Q], config: &SearchConfig) -> Result<Vec<SearchResult>>
where
    Q: AsRef<[u8]> + Sync,
{
    let algo = SearchSchemeAlgorithm::new(index, config)?;
    let run_one = |(query_id, q): (usize, &Q)| {
        let mut out = Vec::new();
        algo.run(query_id, q.as_ref(), |r| out.push(r));
        out
    };

    if config.threads <= 1 {
        return Ok(queries.iter().enumerate().flat_map(run_one).collect());
    }

    debug!("searching {} queries on {} threads", queries.len(), config.threads);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| Error::invalid_config(format!("cannot start {} search threads: {}", config.threads, e)))?;
    let per_query: Vec<Vec<SearchResult>> = pool.install(|| queries.par_iter().enumerate().map(run_one).collect());
    Ok(per_query.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexConfig;
    use crate::util::dna::encode;

    fn index_of(texts: &[&[u8]]) -> BiFmIndex {
        let ranks: Vec<Vec<u8>> = texts.iter().map(|t| encode(t)).collect();
        BiFmIndex::from_texts(&ranks, IndexConfig { sa_sample: 4, occ_block: 8 }).unwrap()
    }

    fn begins(results: &[SearchResult], query_id: usize) -> Vec<usize> {
        results.iter().filter(|r| r.query_id == query_id).map(|r| r.reference_begin).collect()
    }

    #[test]
    fn multiple_queries_keep_their_ids() {
        let idx = index_of(&[b"ACGTACGTACGT"]);
        let queries = vec![encode(b"GG"), encode(b"ACGTACGTACGT"), encode(b"ACGTA")];
        let cfg = SearchConfig::new().max_error(MaxError::total_rate(0.0));
        let res = search(&idx, &queries, &cfg).unwrap();
        assert!(begins(&res, 0).is_empty());
        assert_eq!(begins(&res, 1), vec![0]);
        assert_eq!(begins(&res, 2), vec![0, 4]);
    }

    #[test]
    fn parallel_search_matches_serial_order() {
        let idx = index_of(&[b"ACGTTAGCCATGACGTAGGCTA", b"TTACGAACGTCAGT"]);
        let queries: Vec<Vec<u8>> =
            [&b"ACGTA"[..], b"GACGT", b"TTAC", b"CAGT", b"GGGG", b"ACG"].iter().map(|q| encode(q)).collect();
        let serial = SearchConfig::new().max_error(MaxError::total(1));
        let parallel = serial.threads(3);
        let a = search(&idx, &queries, &serial).unwrap();
        let b = search(&idx, &queries, &parallel).unwrap();
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0].query_id <= w[1].query_id));
    }

    #[test]
    fn invalid_configuration_fails_before_searching() {
        let idx = index_of(&[b"ACGTACGTACGT"]);
        let cfg = SearchConfig::new().max_error(MaxError::Count {
            total: Some(0),
            substitution: Some(1),
            insertion: None,
            deletion: None,
        });
        assert!(matches!(search_one(&idx, &encode(b"ACGT"), &cfg), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn empty_query_has_no_hits() {
        let idx = index_of(&[b"ACGTACGTACGT"]);
        let cfg = SearchConfig::new().max_error(MaxError::total(2));
        assert!(search_one(&idx, &[], &cfg).unwrap().is_empty());
    }
}

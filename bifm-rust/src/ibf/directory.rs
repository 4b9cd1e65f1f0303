//! 按序列分 bin 的目录：序列先经 k-mer / minimiser 哈希，再插入或查询 IBF。

use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::agent::CountingAgent;
use super::counting::{Counter, CountingVector};
use super::{
    BinCount, BinIndex, BinSize, BloomWords, CompressedInterleavedBloomFilter, HashFunctionCount,
    InterleavedBloomFilter,
};
use crate::error::{Error, Result};
use crate::util::dna::DNA4;
use crate::util::kmer::HashVariant;

const FORMAT_VERSION: u32 = 1;

/// IBF 存储形式，决定文件头里的压缩标记。
pub trait IbfStorage: BloomWords + Serialize + DeserializeOwned {
    const COMPRESSED: bool;

    /// 反序列化后的一致性检查
    fn validate(&self) -> Result<()> {
        self.layout().check()
    }
}

impl IbfStorage for InterleavedBloomFilter {
    const COMPRESSED: bool = false;
}

impl IbfStorage for CompressedInterleavedBloomFilter {
    const COMPRESSED: bool = true;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IbfConfig {
    pub bins: BinCount,
    pub bin_size: BinSize,
    pub hash_functions: HashFunctionCount,
    pub hash: HashVariant,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileHeader {
    version: u32,
    sigma: u32,
    compressed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinningDirectory<F = InterleavedBloomFilter> {
    ibf: F,
    hash: HashVariant,
}

impl BinningDirectory<InterleavedBloomFilter> {
    pub fn new(config: IbfConfig) -> Result<Self> {
        config.hash.validate()?;
        let ibf = InterleavedBloomFilter::new(config.bins, config.bin_size, config.hash_functions)?;
        debug!(
            "binning directory: {} bins x {} bits, {} hash functions, {:?}",
            config.bins.0, config.bin_size.0, config.hash_functions.0, config.hash
        );
        Ok(Self { ibf, hash: config.hash })
    }

    /// 把序列的全部哈希值插入 `bin`。
    pub fn emplace_sequence(&mut self, seq: &[u8], bin: BinIndex) -> Result<()> {
        if bin.0 >= self.ibf.bin_count() {
            return Err(Error::invalid_argument(format!(
                "bin index {} is out of bounds, the directory has {} bins",
                bin.0,
                self.ibf.bin_count()
            )));
        }
        let ibf = &mut self.ibf;
        self.hash.for_each_hash(seq, |h| ibf.emplace(h, bin));
        Ok(())
    }

    pub fn increase_bin_number_to(&mut self, new_bins: BinCount) -> Result<()> {
        self.ibf.increase_bin_number_to(new_bins)
    }

    pub fn compress(&self) -> BinningDirectory<CompressedInterleavedBloomFilter> {
        BinningDirectory { ibf: self.ibf.compress(), hash: self.hash }
    }
}

impl<F: IbfStorage> BinningDirectory<F> {
    pub fn ibf(&self) -> &F {
        &self.ibf
    }

    pub fn hash(&self) -> HashVariant {
        self.hash
    }

    pub fn bin_count(&self) -> usize {
        self.ibf.bin_count()
    }

    pub fn counting_agent<T: Counter>(&self) -> DirectoryCountingAgent<'_, F, T> {
        DirectoryCountingAgent { hash: self.hash, agent: self.ibf.counting_agent(), hashes: Vec::new() }
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut w = BufWriter::new(std::fs::File::create(path)?);
        let header = FileHeader { version: FORMAT_VERSION, sigma: DNA4 as u32, compressed: F::COMPRESSED };
        bincode::serialize_into(&mut w, &header)?;
        bincode::serialize_into(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut r = BufReader::new(std::fs::File::open(path)?);
        let header: FileHeader = bincode::deserialize_from(&mut r)?;
        if header.version != FORMAT_VERSION {
            return Err(Error::format_mismatch(format!(
                "binning directory format version {} is not supported (expected {})",
                header.version, FORMAT_VERSION
            )));
        }
        if header.sigma != DNA4 as u32 {
            return Err(Error::format_mismatch(format!(
                "the directory was built over an alphabet of size {} but is being read with an alphabet of size {}",
                header.sigma, DNA4
            )));
        }
        if header.compressed != F::COMPRESSED {
            let kind = |c: bool| if c { "compressed" } else { "uncompressed" };
            return Err(Error::format_mismatch(format!(
                "the directory was built {} but is being read as {}",
                kind(header.compressed),
                kind(F::COMPRESSED)
            )));
        }
        let dir: Self = bincode::deserialize_from(&mut r)?;
        dir.hash.validate()?;
        dir.ibf.validate()?;
        Ok(dir)
    }
}

/// 目录上的计数 agent：序列 -> 哈希 -> 每个 bin 的命中数。
pub struct DirectoryCountingAgent<'d, F, T> {
    hash: HashVariant,
    agent: CountingAgent<'d, F, T>,
    hashes: Vec<u64>,
}

impl<'d, F: BloomWords, T: Counter> DirectoryCountingAgent<'d, F, T> {
    fn fill_hashes(&mut self, seq: &[u8]) {
        self.hashes.clear();
        let hashes = &mut self.hashes;
        self.hash.for_each_hash(seq, |h| hashes.push(h));
    }

    pub fn count_query(&mut self, seq: &[u8]) -> &CountingVector<T> {
        self.fill_hashes(seq);
        self.agent.bulk_count(self.hashes.iter().copied())
    }

    /// 同时返回查询产生的哈希值个数，便于按比例设阈值。
    pub fn count_query_with_total(&mut self, seq: &[u8]) -> (&CountingVector<T>, usize) {
        self.fill_hashes(seq);
        let total = self.hashes.len();
        (self.agent.bulk_count(self.hashes.iter().copied()), total)
    }

    pub fn count_hashes(&mut self, hashes: &[u64]) -> &CountingVector<T> {
        self.agent.bulk_count(hashes.iter().copied())
    }
}

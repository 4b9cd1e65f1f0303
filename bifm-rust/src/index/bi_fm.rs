use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::cursor::BiFmCursor;
use super::fm::FmIndex;
use crate::error::{Error, Result};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SeqInfo {
    pub name: String,
    pub len: usize,
    /// 在正向拼接文本中的起始偏移
    pub offset: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct IndexMeta {
    pub source: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 构建参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// SA 采样间隔，越小 locate 越快、占用越大
    pub sa_sample: usize,
    /// Occ 采样块长
    pub occ_block: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { sa_sample: 16, occ_block: 64 }
    }
}

/// 双向 FM 索引：`fwd` 建在拼接文本 T 上，`rev` 建在每条序列各自反转后的 T^R 上。
///
/// 两边序列顺序与分隔符位置一致，因此压缩字母表完全相同。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BiFmIndex {
    version: u32,
    fwd: FmIndex,
    rev: FmIndex,
    seqs: Vec<SeqInfo>,
    meta: IndexMeta,
}

impl BiFmIndex {
    /// 由若干 rank 序列建索引，序列名自动生成。
    pub fn from_texts<T: AsRef<[u8]>>(texts: &[T], config: IndexConfig) -> Result<Self> {
        let named = texts.iter().enumerate().map(|(i, t)| (format!("seq{}", i), t.as_ref()));
        Self::from_named(named, config)
    }

    pub fn from_named<'a, I>(records: I, config: IndexConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (String, &'a [u8])>,
    {
        let mut text = Vec::new();
        let mut rev_text = Vec::new();
        let mut seqs = Vec::new();

        for (name, ranks) in records {
            if let Some(&bad) = ranks.iter().find(|&&r| r == u8::MAX) {
                return Err(Error::invalid_argument(format!(
                    "rank {} of sequence '{}' does not fit the index alphabet",
                    bad, name
                )));
            }
            let offset = text.len();
            text.extend(ranks.iter().map(|&r| r + 1));
            text.push(0);
            rev_text.extend(ranks.iter().rev().map(|&r| r + 1));
            rev_text.push(0);
            seqs.push(SeqInfo { name, len: ranks.len(), offset });
        }

        if text.len() == seqs.len() {
            return Err(Error::EmptyText);
        }

        debug!(
            "building bidirectional FM index: {} sequences, {} characters, sa_sample={}, occ_block={}",
            seqs.len(),
            text.len(),
            config.sa_sample,
            config.occ_block
        );
        let fwd = FmIndex::build(&text, config.sa_sample, config.occ_block);
        let rev = FmIndex::build(&rev_text, config.sa_sample, config.occ_block);
        debug!("index alphabet size (with delimiter): {}", fwd.sigma());

        Ok(Self { version: FORMAT_VERSION, fwd, rev, seqs, meta: IndexMeta::default() })
    }

    pub fn fwd(&self) -> &FmIndex {
        &self.fwd
    }

    pub fn rev(&self) -> &FmIndex {
        &self.rev
    }

    /// 文本总长（含分隔符）。
    pub fn size(&self) -> usize {
        self.fwd.size()
    }

    pub fn seqs(&self) -> &[SeqInfo] {
        &self.seqs
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = meta;
    }

    /// 根节点游标。
    pub fn cursor(&self) -> BiFmCursor<'_> {
        BiFmCursor::new(self)
    }

    /// 正向文本位置 -> (序列编号, 序列内偏移)
    pub fn to_text_pos(&self, text_pos: usize) -> (usize, usize) {
        let idx = self.seqs.partition_point(|s| s.offset <= text_pos).saturating_sub(1);
        (idx, text_pos - self.seqs[idx].offset)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut w = BufWriter::new(std::fs::File::create(path)?);
        bincode::serialize_into(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        let idx: Self = bincode::deserialize_from(BufReader::new(f))?;
        if idx.version != FORMAT_VERSION {
            return Err(Error::format_mismatch(format!(
                "index format version {} is not supported (expected {})",
                idx.version, FORMAT_VERSION
            )));
        }
        if idx.fwd.size() != idx.rev.size() || idx.fwd.sigma() != idx.rev.sigma() {
            return Err(Error::format_mismatch("forward and reverse halves disagree"));
        }
        Ok(idx)
    }
}

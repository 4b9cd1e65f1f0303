//! FASTA / FASTQ 读取。

pub mod fasta;
pub mod fastq;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub use fasta::{FastaReader, FastaRecord};
pub use fastq::{FastqReader, FastqRecord};

use crate::error::Result;

/// 与格式无关的一条序列。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub id: String,
    pub seq: Vec<u8>,
}

/// 按首个非空白字符（`>` 或 `@`）判断格式，读出全部序列。
pub fn read_sequences(path: impl AsRef<Path>) -> Result<Vec<SequenceRecord>> {
    let mut reader = BufReader::new(File::open(path)?);
    let is_fastq = loop {
        let buf = reader.fill_buf()?;
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(i) => break buf[i] == b'@',
            None if buf.is_empty() => return Ok(Vec::new()),
            None => {
                let n = buf.len();
                reader.consume(n);
            }
        }
    };

    if is_fastq {
        FastqReader::new(reader).map(|r| r.map(|r| SequenceRecord { id: r.id, seq: r.seq })).collect()
    } else {
        FastaReader::new(reader).map(|r| r.map(|r| SequenceRecord { id: r.id, seq: r.seq })).collect()
    }
}

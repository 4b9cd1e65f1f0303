use std::io::BufRead;

use super::fasta::split_header;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

/// 四行一条的 FASTQ（不支持折行）。
pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    records: usize,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), done: false, records: 0 }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();
        Ok(self.reader.read_line(&mut self.buf)? > 0)
    }

    fn malformed(&self, what: &str) -> Error {
        Error::malformed_input(format!("FASTQ record {}: {}", self.records + 1, what))
    }

    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        if self.done {
            return Ok(None);
        }

        // 跳过空行找 '@'
        loop {
            if !self.read_line()? {
                self.done = true;
                return Ok(None);
            }
            if !self.buf.trim().is_empty() {
                break;
            }
        }
        let Some(header) = self.buf.strip_prefix('@') else {
            return Err(self.malformed("header does not start with '@'"));
        };
        let (id, desc) = split_header(header.trim());

        if !self.read_line()? {
            return Err(self.malformed("unexpected end of file after header"));
        }
        let seq: Vec<u8> = self.buf.trim_end().bytes().map(|b| b.to_ascii_uppercase()).collect();

        if !self.read_line()? || !self.buf.starts_with('+') {
            return Err(self.malformed("missing '+' line"));
        }

        if !self.read_line()? {
            return Err(self.malformed("missing quality line"));
        }
        let qual = self.buf.trim_end().as_bytes().to_vec();
        if qual.len() != seq.len() {
            return Err(self.malformed(&format!("sequence length {} but quality length {}", seq.len(), qual.len())));
        }

        self.records += 1;
        Ok(Some(FastqRecord { id, desc, seq, qual }))
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<FastqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

//! Streaming front end of the archive parser
//!
//! Compressed chunks are pushed through a multi-member gzip decoder, the
//! decompressed bytes are split into lines, and every line is handed to the
//! [`RecordParser`]. Records are produced lazily: the source is only read
//! when no completed record is waiting.

use crate::archive::parser::{Record, RecordParser};
use crate::http::{ChunkSource, HttpError};
use flate2::write::MultiGzDecoder;
use std::collections::VecDeque;
use std::io::Write;
use thiserror::Error;

/// Failures while streaming one archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("{0}")]
    Fetch(#[from] HttpError),

    #[error("gzip decode error: {0}")]
    Decode(#[from] std::io::Error),
}

/// Counters describing how much of an archive was read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub compressed_bytes: u64,
    pub decompressed_bytes: u64,
    pub lines: u64,
    pub records: u64,
}

/// Lazy record iterator over a compressed archive body
pub struct ArchiveReader<S> {
    source: S,
    decoder: MultiGzDecoder<Vec<u8>>,
    parser: RecordParser,
    partial_line: Vec<u8>,
    ready: VecDeque<Record>,
    finished: bool,
    stats: ReaderStats,
}

impl<S: ChunkSource> ArchiveReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            decoder: MultiGzDecoder::new(Vec::new()),
            parser: RecordParser::new(),
            partial_line: Vec::new(),
            ready: VecDeque::new(),
            finished: false,
            stats: ReaderStats::default(),
        }
    }

    /// Returns the next complete record, or `None` at end of archive
    pub async fn next_record(&mut self) -> Result<Option<Record>, ArchiveError> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                self.stats.records += 1;
                return Ok(Some(record));
            }

            if self.finished {
                return Ok(None);
            }

            match self.source.next_chunk().await? {
                Some(chunk) => {
                    self.stats.compressed_bytes += chunk.len() as u64;
                    self.decoder.write_all(&chunk)?;
                    self.drain_decoded();
                }
                None => self.finish()?,
            }
        }
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    fn finish(&mut self) -> Result<(), ArchiveError> {
        self.finished = true;
        self.decoder.try_finish()?;
        self.drain_decoded();

        if !self.partial_line.is_empty() {
            let line = std::mem::take(&mut self.partial_line);
            self.step(&line);
        }
        if let Some(record) = self.parser.finish() {
            self.ready.push_back(record);
        }
        Ok(())
    }

    /// Splits everything decoded so far into lines, carrying the unterminated tail
    fn drain_decoded(&mut self) {
        let decoded = std::mem::take(self.decoder.get_mut());
        self.stats.decompressed_bytes += decoded.len() as u64;

        let mut rest = decoded.as_slice();
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (line, tail) = rest.split_at(pos + 1);
            if self.partial_line.is_empty() {
                self.step(line);
            } else {
                let mut joined = std::mem::take(&mut self.partial_line);
                joined.extend_from_slice(line);
                self.step(&joined);
            }
            rest = tail;
        }
        self.partial_line.extend_from_slice(rest);

        // Hand the allocation back to the decoder for the next chunk
        let mut buf = decoded;
        buf.clear();
        *self.decoder.get_mut() = buf;
    }

    fn step(&mut self, line: &[u8]) {
        self.stats.lines += 1;
        if let Some(record) = self.parser.step(line) {
            self.ready.push_back(record);
        }
    }
}

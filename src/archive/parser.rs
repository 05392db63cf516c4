//! Line-stepped WARC record parser
//!
//! The parser never sees the compressed stream; it is fed one decompressed
//! line at a time and emits a [`Record`] whenever a record boundary closes a
//! payload. It keeps no more than the current record's payload in memory.

use crate::url::domain_key;

const RECORD_MARKER: &[u8] = b"WARC/";
const TARGET_URI_HEADER: &[u8] = b"WARC-Target-URI:";

/// One document extracted from an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub target_uri: String,

    /// Normalized host of `target_uri`; empty if it could not be derived
    pub domain: String,

    /// Everything after the first blank line of the record, verbatim
    pub payload: Vec<u8>,
}

/// Parser state between two lines
#[derive(Debug, Default)]
pub struct RecordParser {
    pending_uri: Option<String>,
    pending_domain: String,
    payload: Vec<u8>,
    in_payload: bool,
}

impl RecordParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the parser by one line (terminator included)
    ///
    /// Returns the previous record when `line` starts a new one.
    pub fn step(&mut self, line: &[u8]) -> Option<Record> {
        if line.starts_with(RECORD_MARKER) {
            let completed = self.take_record();
            self.reset();
            return completed;
        }

        if self.in_payload {
            self.payload.extend_from_slice(line);
            return None;
        }

        if let Some(value) = line.strip_prefix(TARGET_URI_HEADER) {
            self.capture_target(value);
            return None;
        }

        if is_blank(line) {
            self.in_payload = true;
            self.payload.clear();
        }

        None
    }

    /// Flushes the record still open at end of stream
    pub fn finish(&mut self) -> Option<Record> {
        let completed = self.take_record();
        self.reset();
        completed
    }

    #[cfg(test)]
    fn buffered_len(&self) -> usize {
        self.payload.len()
    }

    fn capture_target(&mut self, value: &[u8]) {
        let uri = String::from_utf8_lossy(value).trim().to_string();
        if uri.is_empty() {
            tracing::trace!("Skipping empty WARC-Target-URI header");
            return;
        }
        self.pending_domain = domain_key(&uri);
        self.pending_uri = Some(uri);
    }

    /// Emits only complete records: payload started, non-empty, target known
    fn take_record(&mut self) -> Option<Record> {
        if !self.in_payload || self.payload.is_empty() {
            return None;
        }
        let target_uri = self.pending_uri.take()?;
        Some(Record {
            target_uri,
            domain: std::mem::take(&mut self.pending_domain),
            payload: std::mem::take(&mut self.payload),
        })
    }

    fn reset(&mut self) {
        self.pending_uri = None;
        self.pending_domain.clear();
        self.payload.clear();
        self.in_payload = false;
    }
}

fn is_blank(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

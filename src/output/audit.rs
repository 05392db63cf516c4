//! NDJSON audit log of newly written hits
//!
//! One JSON object per line. The active file is picked once when the sink is
//! opened: `<base>.ndjson` while it is below the size ceiling, otherwise the
//! first `<base>_<n>.ndjson` that is. Files are never rotated mid-run.

use crate::output::rolling::io_error;
use crate::output::traits::OutputResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default size ceiling of one audit file
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of payload bytes kept as snippet
pub const DEFAULT_SNIPPET_BYTES: usize = 300;

/// One hit as handed to the sink
#[derive(Debug, Clone, Copy)]
pub struct AuditHit<'a> {
    pub crawl: &'a str,
    pub warc_url: &'a str,
    pub uri: &'a str,
    pub domain: &'a str,
    /// Name of the rule that matched
    pub reason: &'a str,
    pub payload: &'a [u8],
}

/// Serialized shape of one audit line
#[derive(Debug, Serialize)]
struct AuditLine<'a> {
    crawl: &'a str,
    warc_url: &'a str,
    uri: &'a str,
    domain: &'a str,
    reason: &'a str,
    snippet: String,
    found_at: DateTime<Utc>,
}

/// Append-only NDJSON writer
#[derive(Debug)]
pub struct AuditSink {
    path: PathBuf,
    file: File,
    snippet_bytes: usize,
}

impl AuditSink {
    /// Opens the first audit file under `max_bytes` for appending
    pub fn open(base: &Path, max_bytes: u64, snippet_bytes: usize) -> OutputResult<Self> {
        let path = active_path(base, max_bytes);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;

        tracing::info!("Audit log: {}", path.display());
        Ok(Self {
            path,
            file,
            snippet_bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, hit: &AuditHit<'_>) -> OutputResult<()> {
        let line = AuditLine {
            crawl: hit.crawl,
            warc_url: hit.warc_url,
            uri: hit.uri,
            domain: hit.domain,
            reason: hit.reason,
            snippet: snippet(hit.payload, self.snippet_bytes),
            found_at: Utc::now(),
        };

        let mut encoded = serde_json::to_vec(&line)?;
        encoded.push(b'\n');
        self.file
            .write_all(&encoded)
            .map_err(|e| io_error(&self.path, e))?;
        Ok(())
    }
}

/// Picks `<base>.ndjson`, then `<base>_1.ndjson`, `<base>_2.ndjson`, ...
pub fn active_path(base: &Path, max_bytes: u64) -> PathBuf {
    let candidate = |suffix: Option<u32>| {
        let mut name = base.as_os_str().to_owned();
        if let Some(n) = suffix {
            name.push(format!("_{}", n));
        }
        name.push(".ndjson");
        PathBuf::from(name)
    };

    let has_room = |path: &Path| match fs::metadata(path) {
        Ok(meta) => meta.len() < max_bytes,
        Err(_) => true,
    };

    let first = candidate(None);
    if has_room(&first) {
        return first;
    }

    let mut n = 1;
    loop {
        let path = candidate(Some(n));
        if has_room(&path) {
            return path;
        }
        n += 1;
    }
}

/// Leading payload bytes as text, carriage returns removed
///
/// Invalid UTF-8 (including a sequence cut at the boundary) is dropped.
fn snippet(payload: &[u8], limit: usize) -> String {
    let head = &payload[..payload.len().min(limit)];
    let mut text = String::with_capacity(head.len());
    for chunk in head.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text.retain(|c| c != '\r');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn hit(payload: &[u8]) -> AuditHit<'_> {
        AuditHit {
            crawl: "CC-MAIN-2023-06",
            warc_url: "https://data.test/a.warc.gz",
            uri: "http://site1.test/",
            domain: "site1.test",
            reason: "id=commentform",
            payload,
        }
    }

    #[test]
    fn test_record_writes_one_json_line() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("hits");
        let mut sink = AuditSink::open(&base, DEFAULT_MAX_BYTES, DEFAULT_SNIPPET_BYTES).unwrap();
        sink.record(&hit(b"<html>\r\n<form id=\"commentform\">\r\n")).unwrap();
        sink.record(&hit(b"second")).unwrap();

        let text = fs::read_to_string(dir.path().join("hits.ndjson")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["crawl"], "CC-MAIN-2023-06");
        assert_eq!(value["reason"], "id=commentform");
        assert_eq!(value["snippet"], "<html>\n<form id=\"commentform\">\n");
        assert!(value["found_at"].is_string());
    }

    #[test]
    fn test_rotation_picks_first_file_with_room() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("hits");
        fs::write(dir.path().join("hits.ndjson"), vec![b'x'; 64]).unwrap();
        fs::write(dir.path().join("hits_1.ndjson"), vec![b'x'; 64]).unwrap();

        assert_eq!(active_path(&base, 64), dir.path().join("hits_2.ndjson"));
        assert_eq!(active_path(&base, 65), dir.path().join("hits.ndjson"));
    }

    #[test]
    fn test_snippet_is_truncated_and_lossy() {
        let payload = [b'a'; 400];
        assert_eq!(snippet(&payload, 300).len(), 300);

        // "é" split at the limit is dropped rather than replaced
        let payload = "abé".as_bytes();
        assert_eq!(snippet(payload, 3), "ab");
        assert_eq!(snippet(b"a\r\nb\xffc", 300), "a\nbc");
    }
}

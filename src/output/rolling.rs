//! Rolling text-file output
//!
//! Each scope is a directory `<root>/<batch>/<archive key>/` holding
//! `<prefix>.txt`, `<prefix>1.txt`, `<prefix>2.txt`, ... with at most
//! [`MAX_LINES_PER_FILE`] URIs each. Appends always go to the highest-numbered
//! file until it is full.

use crate::output::traits::{
    OutputError, OutputResult, OutputScope, OutputStore, ScopeWriter, WriteOutcome,
};
use crate::url::domain_key;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Line cap of every output file
pub const MAX_LINES_PER_FILE: usize = 1000;

/// Output store writing rolling files under a results directory
#[derive(Debug, Clone)]
pub struct RollingFileStore {
    root: PathBuf,
    max_lines: usize,
}

impl RollingFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_lines: MAX_LINES_PER_FILE,
        }
    }

    /// Overrides the line cap (tests)
    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines.max(1);
        self
    }

    /// Directory of one scope
    pub fn scope_dir(&self, scope: &OutputScope) -> PathBuf {
        self.root
            .join(scope.batch.as_str())
            .join(scope.archive.as_str())
    }
}

impl OutputStore for RollingFileStore {
    fn open(&self, scope: &OutputScope) -> OutputResult<Box<dyn ScopeWriter>> {
        let dir = self.scope_dir(scope);
        fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        let writer = RollingWriter::open(dir, scope.prefix.clone(), self.max_lines)?;
        Ok(Box::new(writer))
    }
}

/// Writer for one scope directory and prefix
#[derive(Debug)]
pub struct RollingWriter {
    dir: PathBuf,
    prefix: String,
    max_lines: usize,
    seen: HashSet<String>,
    current_index: u32,
    current_lines: usize,
    current_file: Option<File>,
    /// Newest file ends mid-line, typically after a manual edit
    unterminated: bool,
}

impl RollingWriter {
    /// Rehydrates the dedup set and the fill level of the newest file
    pub fn open(dir: PathBuf, prefix: String, max_lines: usize) -> OutputResult<Self> {
        let mut indices = existing_indices(&dir, &prefix)?;
        indices.sort_unstable();

        let mut seen = HashSet::new();
        let mut current_lines = 0;
        let mut unterminated = false;
        for &index in &indices {
            let path = file_path(&dir, &prefix, index);
            let bytes = fs::read(&path).map_err(|e| io_error(&path, e))?;
            unterminated = bytes.last().is_some_and(|&b| b != b'\n');
            let text = String::from_utf8_lossy(&bytes);
            current_lines = 0;
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                current_lines += 1;
                let domain = domain_key(line);
                if !domain.is_empty() {
                    seen.insert(domain);
                }
            }
        }

        let current_index = indices.last().copied().unwrap_or(0);
        if !indices.is_empty() {
            tracing::debug!(
                "Rehydrated {} domains from {} file(s) in {}",
                seen.len(),
                indices.len(),
                dir.display()
            );
        }

        Ok(Self {
            dir,
            prefix,
            max_lines,
            seen,
            current_index,
            current_lines,
            current_file: None,
            unterminated,
        })
    }

    /// Path of the file the next line would go to
    pub fn current_path(&self) -> PathBuf {
        file_path(&self.dir, &self.prefix, self.current_index)
    }

    fn append_line(&mut self, line: &str) -> OutputResult<()> {
        if self.current_lines >= self.max_lines {
            self.current_index += 1;
            self.current_lines = 0;
            self.current_file = None;
            self.unterminated = false;
        }

        let path = self.current_path();
        if self.current_file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| io_error(&path, e))?;
            self.current_file = Some(file);
        }

        if let Some(file) = self.current_file.as_mut() {
            if self.unterminated {
                writeln!(file).map_err(|e| io_error(&path, e))?;
                self.unterminated = false;
            }
            writeln!(file, "{}", line).map_err(|e| io_error(&path, e))?;
        }
        self.current_lines += 1;
        Ok(())
    }
}

impl ScopeWriter for RollingWriter {
    fn write(&mut self, uri: &str) -> OutputResult<WriteOutcome> {
        let uri = uri.trim();
        let domain = domain_key(uri);
        if domain.is_empty() {
            return Ok(WriteOutcome::NoDomain);
        }
        if self.seen.contains(&domain) {
            return Ok(WriteOutcome::Duplicate);
        }

        self.append_line(uri)?;
        self.seen.insert(domain);
        Ok(WriteOutcome::Written)
    }

    fn domain_count(&self) -> usize {
        self.seen.len()
    }
}

/// `<prefix>.txt` for index 0, `<prefix><n>.txt` otherwise
fn file_path(dir: &Path, prefix: &str, index: u32) -> PathBuf {
    if index == 0 {
        dir.join(format!("{}.txt", prefix))
    } else {
        dir.join(format!("{}{}.txt", prefix, index))
    }
}

/// Numeric suffix of a rolling file name belonging to `prefix`
fn parse_index(file_name: &str, prefix: &str) -> Option<u32> {
    let stem = file_name.strip_suffix(".txt")?.strip_prefix(prefix)?;
    if stem.is_empty() {
        return Some(0);
    }
    if !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

fn existing_indices(dir: &Path, prefix: &str) -> OutputResult<Vec<u32>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(dir, e)),
    };

    let mut indices = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        if let Some(index) = entry
            .file_name()
            .to_str()
            .and_then(|name| parse_index(name, prefix))
        {
            indices.push(index);
        }
    }
    Ok(indices)
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> OutputError {
    OutputError::Io {
        path: path.display().to_string(),
        source,
    }
}

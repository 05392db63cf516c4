//! Flat-file state store
//!
//! Layout under the state directory:
//!
//! ```text
//! crawl_idx.txt              global batch index
//! <batch>/cursor.txt         next archive index, plain integer
//! <batch>/done_warcs.txt     one archive key per line, append-only
//! ```

use crate::archive::ArchiveKey;
use crate::catalog::BatchId;
use crate::state::traits::{StateError, StateResult, StateStore};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const GLOBAL_INDEX_FILE: &str = "crawl_idx.txt";
const CURSOR_FILE: &str = "cursor.txt";
const DONE_FILE: &str = "done_warcs.txt";

/// State store backed by small text files
#[derive(Debug, Clone)]
pub struct FsStateStore {
    root: PathBuf,
}

impl FsStateStore {
    /// Opens (and creates if needed) a state directory
    pub fn new(root: impl Into<PathBuf>) -> StateResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| io_error(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn batch_dir(&self, batch: &BatchId) -> PathBuf {
        self.root.join(batch.as_str())
    }

    fn cursor_path(&self, batch: &BatchId) -> PathBuf {
        self.batch_dir(batch).join(CURSOR_FILE)
    }

    fn done_path(&self, batch: &BatchId) -> PathBuf {
        self.batch_dir(batch).join(DONE_FILE)
    }

    fn global_path(&self) -> PathBuf {
        self.root.join(GLOBAL_INDEX_FILE)
    }
}

impl StateStore for FsStateStore {
    fn load_cursor(&self, batch: &BatchId) -> u64 {
        read_integer(&self.cursor_path(batch)).unwrap_or(0)
    }

    fn save_cursor(&mut self, batch: &BatchId, index: u64) -> StateResult<()> {
        write_durable(&self.cursor_path(batch), &index.to_string())
    }

    fn load_done_set(&self, batch: &BatchId) -> HashSet<ArchiveKey> {
        let path = self.done_path(batch);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return HashSet::new(),
            Err(e) => {
                tracing::warn!(
                    "Unreadable done-set {}, treating as empty: {}",
                    path.display(),
                    e
                );
                return HashSet::new();
            }
        };

        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ArchiveKey::new)
            .collect()
    }

    fn append_done(&mut self, batch: &BatchId, key: &ArchiveKey) -> StateResult<()> {
        let path = self.done_path(batch);
        ensure_parent(&path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        writeln!(file, "{}", key).map_err(|e| io_error(&path, e))?;
        file.sync_data().map_err(|e| io_error(&path, e))
    }

    fn load_global_index(&self) -> usize {
        read_integer(&self.global_path()).unwrap_or(0) as usize
    }

    fn save_global_index(&mut self, index: usize) -> StateResult<()> {
        write_durable(&self.global_path(), &index.to_string())
    }

    fn reset(&mut self, batch: &BatchId) -> StateResult<()> {
        for path in [self.cursor_path(batch), self.done_path(batch)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&path, e)),
            }
        }
        tracing::info!("Reset resume state for {}", batch);
        Ok(())
    }
}

/// Reads a non-negative integer file; corrupt content is logged and ignored
fn read_integer(path: &Path) -> Option<u64> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Unreadable state file {}: {}", path.display(), e);
            return None;
        }
    };

    match text.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(
                "Corrupt state file {} ({:?}), defaulting to 0",
                path.display(),
                text.trim()
            );
            None
        }
    }
}

/// Replaces a file so that readers see either the old or the new content
fn write_durable(path: &Path, content: &str) -> StateResult<()> {
    ensure_parent(path)?;
    let tmp = path.with_extension("tmp");

    let mut file = fs::File::create(&tmp).map_err(|e| io_error(&tmp, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| io_error(&tmp, e))?;
    file.sync_all().map_err(|e| io_error(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| io_error(path, e))?;
    sync_dir(path.parent());
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: Option<&Path>) {
    if let Some(dir) = dir {
        if let Ok(handle) = fs::File::open(dir) {
            let _ = handle.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: Option<&Path>) {}

fn ensure_parent(path: &Path) -> StateResult<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| io_error(parent, e)),
        None => Ok(()),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.display().to_string(),
        source,
    }
}

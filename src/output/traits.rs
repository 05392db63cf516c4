//! Output store traits and types
//!
//! This module defines the trait interface for deduplicating hit writers and
//! the scope a writer is bound to.

use crate::archive::ArchiveKey;
use crate::catalog::BatchId;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode audit line: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One (batch, archive, category) output scope
///
/// Domains are deduplicated within a scope only; the same site found in two
/// different archives is written once per archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputScope {
    pub batch: BatchId,
    pub archive: ArchiveKey,
    /// File name prefix of the category, e.g. `WP-site`
    pub prefix: String,
}

impl OutputScope {
    pub fn new(batch: BatchId, archive: ArchiveKey, prefix: impl Into<String>) -> Self {
        Self {
            batch,
            archive,
            prefix: prefix.into(),
        }
    }
}

/// Result of offering one URI to a scope writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// First URI for its domain in this scope; persisted
    Written,
    /// Domain already present in the scope
    Duplicate,
    /// No host could be derived from the URI
    NoDomain,
}

/// Writer bound to a single scope
pub trait ScopeWriter {
    /// Offers a URI; only the first URI per domain is kept
    fn write(&mut self, uri: &str) -> OutputResult<WriteOutcome>;

    /// Number of distinct domains known to the scope, including rehydrated ones
    fn domain_count(&self) -> usize;
}

/// Factory for scope writers
pub trait OutputStore {
    /// Opens a scope, rehydrating whatever was written to it before
    fn open(&self, scope: &OutputScope) -> OutputResult<Box<dyn ScopeWriter>>;
}

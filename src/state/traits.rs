//! State store trait and error types
//!
//! This module defines the trait interface for resume-state backends and
//! associated error types.

use crate::archive::ArchiveKey;
use crate::catalog::BatchId;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur while persisting resume state
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;

/// Resume position of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    /// Index of the next unprocessed archive (sequential mode)
    pub cursor: u64,

    /// Number of archives recorded as successfully processed
    pub done: usize,
}

/// Trait for resume-state backends
///
/// Loads never fail: missing or unreadable state reads as zero / empty, since
/// reprocessing an archive is harmless once output is deduplicated. Saves are
/// durable by the time they return.
pub trait StateStore {
    // ===== Per-batch cursor =====

    /// Index of the next archive to process; 0 if absent or unparsable
    fn load_cursor(&self, batch: &BatchId) -> u64;

    /// Persists the cursor before returning
    fn save_cursor(&mut self, batch: &BatchId, index: u64) -> StateResult<()>;

    // ===== Per-batch done-set =====

    /// Archives already processed successfully for this batch
    fn load_done_set(&self, batch: &BatchId) -> HashSet<ArchiveKey>;

    /// Appends one key without rewriting earlier entries
    fn append_done(&mut self, batch: &BatchId, key: &ArchiveKey) -> StateResult<()>;

    // ===== Global progress =====

    /// Index of the first batch not yet fully processed
    fn load_global_index(&self) -> usize;

    fn save_global_index(&mut self, index: usize) -> StateResult<()>;

    // ===== Operator actions =====

    /// Clears cursor and done-set of one batch
    fn reset(&mut self, batch: &BatchId) -> StateResult<()>;

    /// Summary of one batch's resume position
    fn progress(&self, batch: &BatchId) -> BatchProgress {
        BatchProgress {
            cursor: self.load_cursor(batch),
            done: self.load_done_set(batch).len(),
        }
    }
}

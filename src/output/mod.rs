//! Output module for sweep results
//!
//! This module handles:
//! - Deduplicated, rolling per-archive hit files
//! - The optional NDJSON audit log
//! - The run summary returned by the controller

pub mod audit;
mod memory;
pub mod rolling;
pub mod stats;
mod traits;

pub use audit::{AuditHit, AuditSink};
pub use memory::MemoryOutputStore;
pub use rolling::{RollingFileStore, RollingWriter, MAX_LINES_PER_FILE};
pub use stats::{print_report, StopReason, SweepReport};
pub use traits::{OutputError, OutputResult, OutputScope, OutputStore, ScopeWriter, WriteOutcome};

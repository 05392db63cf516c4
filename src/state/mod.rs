//! Resume state for the sweep
//!
//! Three pieces of state make a sweep restartable:
//!
//! - a per-batch cursor (next archive index, sequential mode)
//! - a per-batch done-set of archive keys processed successfully
//! - a global index into the selected batch list
//!
//! Every mutation is durable before the call returns, so a crash loses at
//! most the archive that was being processed.

mod fs;
mod memory;
mod traits;

pub use fs::FsStateStore;
pub use memory::MemoryStateStore;
pub use traits::{BatchProgress, StateError, StateResult, StateStore};

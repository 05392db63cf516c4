//! Run summary produced by the sweep controller
//!
//! This module provides the counters collected during one sweep pass and a
//! human-readable rendering for the command line.

use std::collections::BTreeMap;
use std::fmt;

/// Why a sweep pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// Every selected batch was satisfied or exhausted
    #[default]
    Completed,

    /// `max-files-per-run` archives were attempted
    FileLimit,

    /// `max-batches-per-run` batches were visited
    BatchLimit,

    /// Random mode processed its one archive for this run
    RandomPick,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Completed => "all selected batches done",
            StopReason::FileLimit => "file limit reached",
            StopReason::BatchLimit => "batch limit reached",
            StopReason::RandomPick => "random pick processed",
        };
        f.write_str(text)
    }
}

/// Counters for one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Batches whose manifest was consulted
    pub batches_visited: u64,

    pub archives_attempted: u64,
    pub archives_succeeded: u64,
    pub archives_failed: u64,

    /// Records parsed across all archives, including failed ones
    pub records_scanned: u64,

    /// Newly written sites per category name
    pub new_hits: BTreeMap<String, u64>,

    pub stop_reason: StopReason,
}

impl SweepReport {
    /// Adds new hits for one category
    pub fn add_hits(&mut self, category: &str, count: u64) {
        *self.new_hits.entry(category.to_string()).or_insert(0) += count;
    }

    /// New hits for one category
    pub fn hits(&self, category: &str) -> u64 {
        self.new_hits.get(category).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> u64 {
        self.new_hits.values().sum()
    }
}

/// Prints a report to stdout in a formatted manner
pub fn print_report(report: &SweepReport) {
    println!("=== Sweep Summary ===\n");

    println!("Overview:");
    println!("  Batches visited: {}", report.batches_visited);
    println!("  Archives attempted: {}", report.archives_attempted);
    println!("  Archives succeeded: {}", report.archives_succeeded);
    println!("  Archives failed: {}", report.archives_failed);
    println!("  Records scanned: {}", report.records_scanned);
    println!();

    if !report.new_hits.is_empty() {
        println!("New Sites by Category:");
        for (category, count) in &report.new_hits {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    println!("Stopped: {}", report.stop_reason);
}

//! Crawl catalog access
//!
//! This module provides:
//! - Batch identifiers and year/start-batch selection
//! - Fetching the batch list and per-batch archive manifests

mod batch;
mod client;

pub use batch::{filter_by_year, select_batches, BatchId, BATCH_PREFIX};
pub use client::{parse_catalog, parse_manifest, CatalogClient};

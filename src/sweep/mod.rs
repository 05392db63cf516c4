//! Sweep orchestration
//!
//! This module contains:
//! - The archive selection policy
//! - The controller driving one sweep pass
//! - Entry points for the operator commands (run, dry run, status)

mod controller;
pub mod policy;

pub use controller::SweepController;
pub use policy::{Selection, RANDOM_ATTEMPTS};

pub use crate::output::{StopReason, SweepReport};

use crate::catalog::{filter_by_year, select_batches, BatchId, CatalogClient};
use crate::config::{Config, SweepMode};
use crate::http::HttpClient;
use crate::output::RollingFileStore;
use crate::state::{FsStateStore, StateStore};
use crate::SweepError;
use std::collections::BTreeSet;
use std::fs;

/// Runs one sweep pass with on-disk state and rolling-file output
///
/// # Example
///
/// ```no_run
/// use warc_sweep::config::load_config;
/// use warc_sweep::run_sweep;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("sweep.toml"))?;
/// let report = run_sweep(config).await?;
/// println!("{} new sites", report.total_hits());
/// # Ok(())
/// # }
/// ```
pub async fn run_sweep(config: Config) -> Result<SweepReport, SweepError> {
    let http = HttpClient::new(&config.http)?;
    let state = FsStateStore::new(config.paths.state_dir())?;
    let output = RollingFileStore::new(config.paths.results_dir());

    let mut controller = SweepController::new(config, http, state, output)?;
    controller.run().await
}

/// What a run would cover, without touching any archive
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub mode: SweepMode,
    pub catalog_size: usize,
    pub batches: Vec<BatchId>,
}

/// Lists the batches a run would walk; fetches the catalog only
pub async fn plan_sweep(config: &Config) -> Result<SweepPlan, SweepError> {
    let http = HttpClient::new(&config.http)?;
    let catalog = CatalogClient::new(http, config);

    let all = catalog.list_batches().await?;
    let batches = select_batches(
        &all,
        config.sweep.start_batch.as_deref(),
        config.sweep.from_year,
        config.sweep.to_year,
    )?;

    Ok(SweepPlan {
        mode: config.sweep.archives_per_batch,
        catalog_size: all.len(),
        batches,
    })
}

/// Local resume position of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchStatus {
    pub batch: BatchId,
    pub cursor: u64,
    pub done: usize,
    /// Archive count of the cached manifest, if it was fetched before
    pub archives: Option<usize>,
}

/// Local view of the sweep: global index plus every known batch
#[derive(Debug, Clone)]
pub struct SweepStatus {
    pub global_index: usize,
    pub batches: Vec<BatchStatus>,
}

/// Reads the resume state from disk without any network access
///
/// Known batches are those with a state directory or a cached manifest,
/// narrowed by the configured start batch or year range.
pub fn sweep_status(config: &Config) -> Result<SweepStatus, SweepError> {
    let http = HttpClient::new(&config.http)?;
    let catalog = CatalogClient::new(http, config);
    let state = FsStateStore::new(config.paths.state_dir())?;

    let known = known_batches(config)?;
    let known: Vec<BatchId> = match config.sweep.start_batch.as_deref() {
        Some(start) => known.into_iter().filter(|b| b.as_str() >= start).collect(),
        None => filter_by_year(&known, config.sweep.from_year, config.sweep.to_year),
    };

    let batches = known
        .into_iter()
        .map(|batch| {
            let progress = state.progress(&batch);
            BatchStatus {
                archives: catalog.cached_archive_count(&batch),
                cursor: progress.cursor,
                done: progress.done,
                batch,
            }
        })
        .collect();

    Ok(SweepStatus {
        global_index: state.load_global_index(),
        batches,
    })
}

/// Batch ids that appear under the state or manifest cache directories
fn known_batches(config: &Config) -> Result<Vec<BatchId>, SweepError> {
    let mut ids = BTreeSet::new();

    for dir in [config.paths.state_dir(), config.paths.manifest_cache_dir()] {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            let id = name.strip_suffix(".paths").unwrap_or(name);
            if BatchId::is_recognized(id) {
                ids.insert(id.to_string());
            }
        }
    }

    Ok(ids.into_iter().map(BatchId::new).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveKey;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.root = dir.path().to_path_buf();
        config
    }

    #[test]
    fn test_status_reads_local_state() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let mut state = FsStateStore::new(config.paths.state_dir()).unwrap();
        let batch = BatchId::from("CC-MAIN-2019-13");
        state.save_cursor(&batch, 4).unwrap();
        state.append_done(&batch, &ArchiveKey::new("a")).unwrap();
        state.save_global_index(1).unwrap();

        fs::create_dir_all(config.paths.manifest_cache_dir()).unwrap();
        fs::write(
            config.paths.manifest_cache_dir().join("CC-MAIN-2019-13.paths"),
            "a.warc.gz\nb.warc.gz\n",
        )
        .unwrap();
        fs::write(
            config.paths.manifest_cache_dir().join("CC-MAIN-2011-01.paths"),
            "x.warc.gz\n",
        )
        .unwrap();

        let status = sweep_status(&config).unwrap();
        assert_eq!(status.global_index, 1);
        assert_eq!(
            status.batches,
            vec![BatchStatus {
                batch,
                cursor: 4,
                done: 1,
                archives: Some(2),
            }]
        );
    }

    #[test]
    fn test_status_on_fresh_root() {
        let dir = TempDir::new().unwrap();
        let status = sweep_status(&config_in(&dir)).unwrap();
        assert_eq!(status.global_index, 0);
        assert!(status.batches.is_empty());
    }
}

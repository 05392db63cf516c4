//! Sweep controller - main sweep orchestration logic
//!
//! This module contains the loop that coordinates one sweep pass:
//! - Listing and narrowing the batch catalog
//! - Consulting the selection policy per batch
//! - Streaming, matching and writing each chosen archive
//! - Persisting resume state after every archive

use crate::archive::{ArchiveError, ArchiveKey, ArchiveReader};
use crate::catalog::{select_batches, BatchId, CatalogClient};
use crate::config::{Config, SweepMode};
use crate::http::HttpClient;
use crate::matcher::FingerprintMatcher;
use crate::output::{
    AuditHit, AuditSink, OutputScope, OutputStore, ScopeWriter, StopReason, SweepReport,
    WriteOutcome,
};
use crate::state::StateStore;
use crate::sweep::policy::{quota_satisfied, select_random, select_sequential, Selection};
use crate::SweepError;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Drives one sweep pass over the selected batches
pub struct SweepController<S, O> {
    config: Config,
    catalog: CatalogClient,
    http: HttpClient,
    matcher: FingerprintMatcher,
    state: S,
    output: O,
    audit: Option<AuditSink>,
    rng: StdRng,
    report: SweepReport,
}

impl<S: StateStore, O: OutputStore> SweepController<S, O> {
    /// Creates a controller
    ///
    /// # Arguments
    ///
    /// * `config` - Validated sweep configuration
    /// * `http` - Client shared by catalog and archive requests
    /// * `state` - Resume state backend
    /// * `output` - Hit output backend
    ///
    /// # Returns
    ///
    /// * `Ok(SweepController)` - Fingerprints compiled and audit log opened
    /// * `Err(SweepError)` - Invalid fingerprint or unwritable audit log
    pub fn new(config: Config, http: HttpClient, state: S, output: O) -> Result<Self, SweepError> {
        let matcher = FingerprintMatcher::from_config(&config)?;
        let audit = if config.audit.enabled {
            Some(AuditSink::open(
                &config.paths.audit_base(),
                config.audit.max_bytes,
                config.audit.snippet_bytes,
            )?)
        } else {
            None
        };
        let catalog = CatalogClient::new(http.clone(), &config);

        Ok(Self {
            config,
            catalog,
            http,
            matcher,
            state,
            output,
            audit,
            rng: StdRng::from_entropy(),
            report: SweepReport::default(),
        })
    }

    /// Replaces the random source (deterministic tests)
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Runs one sweep pass
    ///
    /// The pass ends when every selected batch is done, when a run limit is
    /// reached, or, in random mode, right after the one archive it picked.
    /// Catalog, manifest and state persistence failures abort the pass; a
    /// failing archive is logged and counted but does not.
    pub async fn run(&mut self) -> Result<SweepReport, SweepError> {
        self.report = SweepReport::default();

        let all = self.catalog.list_batches().await?;
        let batches = select_batches(
            &all,
            self.config.sweep.start_batch.as_deref(),
            self.config.sweep.from_year,
            self.config.sweep.to_year,
        )?;

        let mode = self.config.sweep.archives_per_batch;
        tracing::info!(
            "Mode = {} | {} of {} batches selected",
            mode,
            batches.len(),
            all.len()
        );

        if batches.is_empty() {
            tracing::warn!("No batches match the configured range or start batch");
            return Ok(std::mem::take(&mut self.report));
        }

        let stop = match mode {
            SweepMode::Exhaustive => self.run_sequential(&batches).await?,
            SweepMode::RandomQuota(quota) => self.run_random(&batches, quota).await?,
        };
        self.report.stop_reason = stop;

        tracing::info!(
            "Sweep pass finished ({}): {} archives attempted, {} failed, {} new sites",
            stop,
            self.report.archives_attempted,
            self.report.archives_failed,
            self.report.total_hits()
        );
        Ok(std::mem::take(&mut self.report))
    }

    /// Exhaustive mode: every archive of each batch, in manifest order
    async fn run_sequential(&mut self, batches: &[BatchId]) -> Result<StopReason, SweepError> {
        let start = self.state.load_global_index();
        if start >= batches.len() {
            tracing::info!("All {} selected batches already processed", batches.len());
            return Ok(StopReason::Completed);
        }

        for (idx, batch) in batches.iter().enumerate().skip(start) {
            if self.file_limit_reached() {
                tracing::info!("File limit reached before {}", batch);
                return Ok(StopReason::FileLimit);
            }
            if self.batch_limit_reached() {
                return Ok(StopReason::BatchLimit);
            }
            self.report.batches_visited += 1;

            let archives = self.catalog.list_archives(batch).await?;
            let mut cursor = self.state.load_cursor(batch);
            if cursor > 0 {
                tracing::info!("{}: resuming at archive {}/{}", batch, cursor, archives.len());
            }

            loop {
                let (index, key) = match select_sequential(&archives, cursor) {
                    Selection::Process { index, key } => (index, key),
                    _ => break,
                };

                if self.file_limit_reached() {
                    tracing::info!("{}: file limit reached at archive {}", batch, index);
                    return Ok(StopReason::FileLimit);
                }

                let succeeded = self.process_archive(batch, &archives[index], &key).await;

                cursor = index as u64 + 1;
                self.state.save_cursor(batch, cursor)?;
                if succeeded {
                    self.state.append_done(batch, &key)?;
                }
            }

            tracing::info!("{}: all {} archives processed", batch, archives.len());
            self.state.save_global_index(idx + 1)?;
        }

        Ok(StopReason::Completed)
    }

    /// Random mode: at most one archive per run, up to the quota per batch
    async fn run_random(&mut self, batches: &[BatchId], quota: u32) -> Result<StopReason, SweepError> {
        for batch in batches {
            let done = self.state.load_done_set(batch);
            if quota_satisfied(&done, quota) {
                tracing::debug!("{}: quota {} already met, skipping", batch, quota);
                continue;
            }

            if self.batch_limit_reached() {
                return Ok(StopReason::BatchLimit);
            }
            self.report.batches_visited += 1;

            let archives = self.catalog.list_archives(batch).await?;
            match select_random(&archives, &done, quota, &mut self.rng) {
                Selection::Process { index, key } => {
                    if self.file_limit_reached() {
                        return Ok(StopReason::FileLimit);
                    }
                    tracing::info!(
                        "{}: picked archive {} ({}/{} done)",
                        batch,
                        index,
                        done.len(),
                        quota
                    );
                    if self.process_archive(batch, &archives[index], &key).await {
                        self.state.append_done(batch, &key)?;
                    }
                    return Ok(StopReason::RandomPick);
                }
                Selection::BatchComplete => {
                    tracing::info!("{}: manifest is empty, moving on", batch);
                }
                Selection::BatchExhausted => {
                    tracing::info!(
                        "{}: no unprocessed archive found, treating batch as exhausted",
                        batch
                    );
                }
                Selection::BatchSatisfied => {}
            }
        }

        Ok(StopReason::Completed)
    }

    /// Scans one archive and updates the report; returns whether it succeeded
    async fn process_archive(&mut self, batch: &BatchId, path: &str, key: &ArchiveKey) -> bool {
        let url = self.catalog.archive_url(path);
        self.report.archives_attempted += 1;
        tracing::info!("{}: scanning {}", batch, url);

        match self.scan_archive(batch, key, &url).await {
            Ok(counts) => {
                self.report.archives_succeeded += 1;
                let summary = self
                    .matcher
                    .categories()
                    .iter()
                    .zip(&counts)
                    .map(|(category, count)| format!("{}:+{}", category.output_prefix, count))
                    .collect::<Vec<_>>()
                    .join(", ");
                for (category, count) in self.matcher.categories().iter().zip(&counts) {
                    self.report.add_hits(&category.name, *count);
                }
                tracing::info!("{}: {} done ({})", batch, key, summary);
                true
            }
            Err(e) => {
                self.report.archives_failed += 1;
                tracing::warn!("{}: archive {} failed: {}", batch, url, e);
                false
            }
        }
    }

    /// Streams an archive through the matcher into the output scopes
    ///
    /// Returns the number of newly written sites per category.
    async fn scan_archive(
        &mut self,
        batch: &BatchId,
        key: &ArchiveKey,
        url: &str,
    ) -> Result<Vec<u64>, SweepError> {
        let mut writers = self
            .matcher
            .categories()
            .iter()
            .map(|category| {
                self.output.open(&OutputScope::new(
                    batch.clone(),
                    key.clone(),
                    category.output_prefix.clone(),
                ))
            })
            .collect::<Result<Vec<Box<dyn ScopeWriter>>, _>>()?;
        let mut counts = vec![0u64; writers.len()];

        let body = self
            .http
            .get_stream(url)
            .await
            .map_err(|source| SweepError::ArchiveFetchFailed {
                url: url.to_string(),
                source,
            })?;
        let mut reader = ArchiveReader::new(body);

        loop {
            let record = match reader.next_record().await {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(ArchiveError::Fetch(source)) => {
                    return Err(SweepError::ArchiveFetchFailed {
                        url: url.to_string(),
                        source,
                    })
                }
                Err(ArchiveError::Decode(e)) => {
                    return Err(SweepError::MalformedArchive {
                        url: url.to_string(),
                        message: e.to_string(),
                    })
                }
            };
            self.report.records_scanned += 1;

            for hit in self.matcher.matches(&record.payload) {
                let outcome = writers[hit.category].write(&record.target_uri)?;
                if outcome != WriteOutcome::Written {
                    continue;
                }
                counts[hit.category] += 1;

                if let Some(audit) = self.audit.as_mut() {
                    audit.record(&AuditHit {
                        crawl: batch.as_str(),
                        warc_url: url,
                        uri: &record.target_uri,
                        domain: &record.domain,
                        reason: hit.rule,
                        payload: &record.payload,
                    })?;
                }
            }
        }

        let stats = reader.stats();
        tracing::debug!(
            "{}: {} records, {} compressed / {} decompressed bytes",
            key,
            stats.records,
            stats.compressed_bytes,
            stats.decompressed_bytes
        );
        Ok(counts)
    }

    fn file_limit_reached(&self) -> bool {
        self.config
            .sweep
            .max_files_per_run
            .is_some_and(|max| self.report.archives_attempted >= u64::from(max))
    }

    fn batch_limit_reached(&self) -> bool {
        self.config
            .sweep
            .max_batches_per_run
            .is_some_and(|max| self.report.batches_visited >= u64::from(max))
    }
}

//! Catalog and manifest fetching
//!
//! The catalog lists every crawl batch; each batch publishes a gzip-compressed
//! manifest of its archive paths. Manifests are cached on disk in decompressed
//! form because the resume cursor is an offset into exactly that list.

use crate::catalog::batch::BatchId;
use crate::config::Config;
use crate::http::HttpClient;
use crate::{CatalogFailure, SweepError};
use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// One entry of the catalog document; only the id matters here
#[derive(Debug, Deserialize)]
struct CollectionInfo {
    #[serde(default)]
    id: Option<String>,
}

/// Read-only client for the crawl catalog and per-batch manifests
pub struct CatalogClient {
    http: HttpClient,
    catalog_url: String,
    data_url: String,
    cache_dir: PathBuf,
}

impl CatalogClient {
    pub fn new(http: HttpClient, config: &Config) -> Self {
        Self {
            http,
            catalog_url: config.http.catalog_url.clone(),
            data_url: config.http.data_url.clone(),
            cache_dir: config.paths.manifest_cache_dir(),
        }
    }

    /// Fetches all recognized batch ids, oldest first
    pub async fn list_batches(&self) -> Result<Vec<BatchId>, SweepError> {
        let body = self
            .http
            .get_bytes(&self.catalog_url)
            .await
            .map_err(|e| catalog_unavailable("catalog fetch", e))?;

        let batches = parse_catalog(&body).map_err(|e| catalog_unavailable("catalog parse", e))?;
        tracing::debug!("Catalog lists {} batches", batches.len());
        Ok(batches)
    }

    /// Returns the ordered archive paths of a batch
    ///
    /// The cached manifest is used when present; otherwise it is fetched,
    /// decompressed and written to the cache before being returned.
    pub async fn list_archives(&self, batch: &BatchId) -> Result<Vec<String>, SweepError> {
        let cache_path = self.cache_path(batch);

        if cache_path.is_file() {
            let text = fs::read_to_string(&cache_path)
                .map_err(|e| catalog_unavailable(format!("manifest cache {}", batch), e))?;
            let paths = parse_manifest(&text);
            tracing::info!(
                "{}: using cached {} ({} archives)",
                batch,
                cache_path.display(),
                paths.len()
            );
            return Ok(paths);
        }

        let url = self.manifest_url(batch);
        tracing::info!("Fetching manifest for {} from {}", batch, url);
        let raw = self
            .http
            .get_bytes(&url)
            .await
            .map_err(|e| catalog_unavailable(format!("manifest fetch {}", batch), e))?;

        let text = gunzip_text(&raw)
            .map_err(|e| catalog_unavailable(format!("manifest decode {}", batch), e))?;
        write_cache(&cache_path, &text)
            .map_err(|e| catalog_unavailable(format!("manifest cache {}", batch), e))?;

        let paths = parse_manifest(&text);
        tracing::info!(
            "{}: cached {} ({} archives)",
            batch,
            cache_path.display(),
            paths.len()
        );
        Ok(paths)
    }

    /// Number of archives in the cached manifest, if one exists
    pub fn cached_archive_count(&self, batch: &BatchId) -> Option<usize> {
        fs::read_to_string(self.cache_path(batch))
            .ok()
            .map(|text| parse_manifest(&text).len())
    }

    /// Full download URL of an archive path
    pub fn archive_url(&self, archive_path: &str) -> String {
        format!("{}{}", self.data_url, archive_path.trim_start_matches('/'))
    }

    fn manifest_url(&self, batch: &BatchId) -> String {
        format!("{}crawl-data/{}/warc.paths.gz", self.data_url, batch)
    }

    fn cache_path(&self, batch: &BatchId) -> PathBuf {
        self.cache_dir.join(format!("{}.paths", batch))
    }
}

fn catalog_unavailable(context: impl Into<String>, source: impl Into<CatalogFailure>) -> SweepError {
    SweepError::CatalogUnavailable {
        context: context.into(),
        source: source.into(),
    }
}

/// Parses the catalog JSON into sorted, recognized batch ids
pub fn parse_catalog(body: &[u8]) -> Result<Vec<BatchId>, serde_json::Error> {
    let rows: Vec<CollectionInfo> = serde_json::from_slice(body)?;
    let mut batches: Vec<BatchId> = rows
        .into_iter()
        .filter_map(|row| row.id)
        .filter(|id| BatchId::is_recognized(id))
        .map(BatchId::new)
        .collect();
    batches.sort();
    batches.dedup();
    Ok(batches)
}

/// Splits a manifest into archive paths, dropping blank lines
pub fn parse_manifest(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn gunzip_text(raw: &[u8]) -> std::io::Result<String> {
    let mut decoded = Vec::new();
    MultiGzDecoder::new(raw).read_to_end(&mut decoded)?;
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

/// Writes the cache atomically so a crash never leaves a truncated manifest
fn write_cache(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("paths.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

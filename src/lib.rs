//! warc-sweep: a resumable fingerprint sweep over Common Crawl archives
//!
//! This crate walks Common Crawl batches archive by archive, streams each
//! gzip-compressed WARC file, matches every payload against byte-level
//! fingerprints (WordPress comment forms, Wix generator tags, ...) and records
//! the distinct sites per fingerprint into rolling, deduplicated text files.
//! Progress is persisted after every archive so a sweep can be stopped and
//! resumed at any point.

pub mod archive;
pub mod catalog;
pub mod config;
pub mod http;
pub mod matcher;
pub mod output;
pub mod state;
pub mod sweep;
pub mod url;

use thiserror::Error;

/// Main error type for sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog unavailable ({context}): {source}")]
    CatalogUnavailable {
        context: String,
        source: CatalogFailure,
    },

    #[error("Archive fetch failed for {url}: {source}")]
    ArchiveFetchFailed { url: String, source: http::HttpError },

    #[error("Malformed archive stream for {url}: {message}")]
    MalformedArchive { url: String, message: String },

    #[error("State error: {0}")]
    State(#[from] state::StateError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Http(#[from] http::HttpError),

    #[error("Unknown start batch: {0}")]
    UnknownStartBatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Underlying cause of a catalog or manifest failure
#[derive(Debug, Error)]
pub enum CatalogFailure {
    #[error("{0}")]
    Http(#[from] http::HttpError),

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid fingerprint pattern {name}: {message}")]
    InvalidPattern { name: String, message: String },
}

/// Result type alias for sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use archive::{ArchiveKey, Record};
pub use catalog::BatchId;
pub use config::Config;
pub use sweep::{run_sweep, SweepController, SweepReport};
pub use url::domain_key;

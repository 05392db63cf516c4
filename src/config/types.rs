use crate::output::audit::{DEFAULT_MAX_BYTES, DEFAULT_SNIPPET_BYTES};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// User agent sent with every request unless overridden
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) CC-WP-Wix-Resume/1.3";

/// Main configuration structure for a sweep
///
/// Every section is optional in the TOML file; missing sections fall back to
/// their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub categories: CategoryToggles,
    #[serde(default)]
    pub audit: AuditConfig,
    /// Additional user-defined fingerprints
    #[serde(default, rename = "fingerprint")]
    pub fingerprints: Vec<FingerprintEntry>,
}

/// How archives are chosen within one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ArchivesPerBatchRepr")]
pub enum SweepMode {
    /// Process every archive of a batch in manifest order
    Exhaustive,
    /// Process this many randomly chosen archives per batch, one per run
    RandomQuota(u32),
}

impl Default for SweepMode {
    fn default() -> Self {
        Self::RandomQuota(1)
    }
}

impl FromStr for SweepMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "all" {
            return Ok(Self::Exhaustive);
        }
        s.parse::<i64>()
            .map(|n| Self::RandomQuota(n.clamp(1, u32::MAX as i64) as u32))
            .map_err(|_| format!("archives-per-batch must be a number or \"all\", got '{}'", s))
    }
}

impl fmt::Display for SweepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhaustive => write!(f, "ALL (sequential)"),
            Self::RandomQuota(q) => write!(f, "RANDOM {}/crawl", q),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArchivesPerBatchRepr {
    Count(i64),
    Text(String),
}

impl TryFrom<ArchivesPerBatchRepr> for SweepMode {
    type Error = String;

    fn try_from(value: ArchivesPerBatchRepr) -> Result<Self, Self::Error> {
        match value {
            ArchivesPerBatchRepr::Count(n) => Ok(Self::RandomQuota(n.clamp(1, u32::MAX as i64) as u32)),
            ArchivesPerBatchRepr::Text(s) => s.parse(),
        }
    }
}

/// Batch selection and run limits
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SweepConfig {
    /// Oldest crawl year to include
    pub from_year: Option<i32>,

    /// Newest crawl year to include
    pub to_year: Option<i32>,

    /// Start at this batch and ignore the year range
    pub start_batch: Option<String>,

    /// `"all"` for an exhaustive sweep, or a per-batch random quota
    pub archives_per_batch: SweepMode,

    /// Stop after touching this many batches in one run
    pub max_batches_per_run: Option<u32>,

    /// Stop after processing this many archives in one run
    pub max_files_per_run: Option<u32>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            from_year: Some(2013),
            to_year: Some(2025),
            start_batch: None,
            archives_per_batch: SweepMode::default(),
            max_batches_per_run: None,
            max_files_per_run: None,
        }
    }
}

/// On-disk locations for state, caches and results
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PathsConfig {
    pub root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

impl PathsConfig {
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    pub fn manifest_cache_dir(&self) -> PathBuf {
        self.root.join("warc_paths_cache")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results")
    }

    /// Base path of the audit log, without extension
    pub fn audit_base(&self) -> PathBuf {
        self.root.join("hits")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// HTTP client behaviour and remote endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HttpConfig {
    pub user_agent: String,

    /// Connect timeout and per-read timeout, in seconds
    pub timeout_secs: u64,

    /// Total attempts for a request, including the first one
    pub max_attempts: u32,

    pub initial_backoff_ms: u64,

    pub max_backoff_ms: u64,

    /// Location of the crawl catalog JSON
    pub catalog_url: String,

    /// Prefix for manifest and archive paths
    pub data_url: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 60,
            max_attempts: 5,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
            catalog_url: "https://index.commoncrawl.org/collinfo.json".to_string(),
            data_url: "https://data.commoncrawl.org/".to_string(),
        }
    }
}

/// Enable switches for the built-in fingerprints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CategoryToggles {
    pub wordpress: bool,
    pub wix: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            wordpress: true,
            wix: true,
        }
    }
}

/// NDJSON hit log configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AuditConfig {
    pub enabled: bool,

    /// Size at which the active audit file rolls over
    pub max_bytes: u64,

    /// Number of payload bytes kept in each record's snippet
    pub snippet_bytes: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_bytes: DEFAULT_MAX_BYTES,
            snippet_bytes: DEFAULT_SNIPPET_BYTES,
        }
    }
}

/// A user-defined fingerprint category
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FingerprintEntry {
    pub name: String,

    /// File name prefix of the rolling output files
    pub output_prefix: String,

    /// Rules evaluated in order; the first match wins
    pub rules: Vec<RuleEntry>,
}

/// One named pattern of a fingerprint
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    pub name: String,
    pub pattern: String,
}

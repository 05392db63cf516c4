//! warc-sweep main entry point
//!
//! This is the command-line interface for the resumable Common Crawl
//! fingerprint sweep.

use clap::builder::BoolishValueParser;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use warc_sweep::catalog::BatchId;
use warc_sweep::config::{load_config_with_hash, validate, Config, SweepMode};
use warc_sweep::output::print_report;
use warc_sweep::state::{FsStateStore, StateStore};
use warc_sweep::sweep::{plan_sweep, sweep_status};
use warc_sweep::run_sweep;

/// warc-sweep: fingerprint sweep over Common Crawl archives
///
/// Walks crawl batches archive by archive, records the distinct sites
/// carrying a WordPress comment form, a Wix generator tag or any configured
/// fingerprint, and resumes where the previous run stopped.
#[derive(Parser, Debug)]
#[command(name = "warc-sweep")]
#[command(version = "1.0.0")]
#[command(about = "Resumable fingerprint sweep over Common Crawl", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Oldest crawl year to include
    #[arg(long, env = "SCAN_FROM_YEAR")]
    from_year: Option<i32>,

    /// Newest crawl year to include
    #[arg(long, env = "SCAN_TO_YEAR")]
    to_year: Option<i32>,

    /// Start at this batch and ignore the year range
    #[arg(long, env = "START_CRAWL_ID", value_name = "BATCH")]
    start_batch: Option<String>,

    /// Archives per batch: a number for random sampling, or "all"
    #[arg(long, env = "WARC_PER_CRAWL", value_name = "N|all")]
    archives_per_batch: Option<SweepMode>,

    /// Write the NDJSON audit log
    #[arg(long, env = "HITS_NDJSON", value_parser = BoolishValueParser::new())]
    audit: Option<bool>,

    /// Enable the WordPress fingerprint
    #[arg(long, env = "WP_SITE_ENABLED", value_parser = BoolishValueParser::new())]
    wordpress: Option<bool>,

    /// Enable the Wix fingerprint
    #[arg(long, env = "WIX_SITE_ENABLED", value_parser = BoolishValueParser::new())]
    wix: Option<bool>,

    /// Directory holding state, manifest cache, results and audit log
    #[arg(long, env = "REPO_DIR", value_name = "DIR")]
    root: Option<PathBuf>,

    /// Validate config and list the batches a run would cover
    #[arg(long, conflicts_with_all = ["status", "reset"])]
    dry_run: bool,

    /// Show local resume state and exit
    #[arg(long, conflicts_with_all = ["dry_run", "reset"])]
    status: bool,

    /// Clear the cursor and done-set of one batch and exit
    #[arg(long, value_name = "BATCH", conflicts_with_all = ["dry_run", "status"])]
    reset: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load configuration, then apply command line / environment overrides
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };
    apply_overrides(&mut config, &cli);
    if let Err(e) = validate(&config) {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config).await?;
    } else if cli.status {
        handle_status(&config)?;
    } else if let Some(batch) = &cli.reset {
        handle_reset(&config, batch)?;
    } else {
        handle_sweep(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warc_sweep=info,warn"),
            1 => EnvFilter::new("warc_sweep=debug,info"),
            2 => EnvFilter::new("warc_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies the flags that were given explicitly (or through the environment)
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(year) = cli.from_year {
        config.sweep.from_year = Some(year);
    }
    if let Some(year) = cli.to_year {
        config.sweep.to_year = Some(year);
    }
    if let Some(start) = cli.start_batch.as_ref().filter(|s| !s.trim().is_empty()) {
        config.sweep.start_batch = Some(start.trim().to_string());
    }
    if let Some(mode) = cli.archives_per_batch {
        config.sweep.archives_per_batch = mode;
    }
    if let Some(enabled) = cli.audit {
        config.audit.enabled = enabled;
    }
    if let Some(enabled) = cli.wordpress {
        config.categories.wordpress = enabled;
    }
    if let Some(enabled) = cli.wix {
        config.categories.wix = enabled;
    }
    if let Some(root) = &cli.root {
        config.paths.root = root.clone();
    }
}

/// Handles the --dry-run mode: shows what a run would cover
async fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== warc-sweep Dry Run ===\n");

    println!("Sweep:");
    println!("  Mode: {}", config.sweep.archives_per_batch);
    match &config.sweep.start_batch {
        Some(start) => println!("  Start batch: {}", start),
        None => println!(
            "  Years: {}..{}",
            year_label(config.sweep.from_year),
            year_label(config.sweep.to_year)
        ),
    }
    if let Some(max) = config.sweep.max_files_per_run {
        println!("  Max files per run: {}", max);
    }
    if let Some(max) = config.sweep.max_batches_per_run {
        println!("  Max batches per run: {}", max);
    }

    println!("\nPaths:");
    println!("  State: {}", config.paths.state_dir().display());
    println!("  Manifest cache: {}", config.paths.manifest_cache_dir().display());
    println!("  Results: {}", config.paths.results_dir().display());
    if config.audit.enabled {
        println!("  Audit log: {}.ndjson", config.paths.audit_base().display());
    }

    println!("\nFingerprints:");
    println!("  wordpress: {}", on_off(config.categories.wordpress));
    println!("  wix: {}", on_off(config.categories.wix));
    for entry in &config.fingerprints {
        println!("  {}: on ({} rules)", entry.name, entry.rules.len());
    }

    let plan = plan_sweep(config).await?;
    println!(
        "\nBatches ({} of {} in catalog):",
        plan.batches.len(),
        plan.catalog_size
    );
    for batch in &plan.batches {
        println!("  - {}", batch);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --status mode: shows local resume state
fn handle_status(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let status = sweep_status(config)?;

    println!("State: {}\n", config.paths.state_dir().display());
    println!("Global batch index: {}", status.global_index);

    if status.batches.is_empty() {
        println!("\nNo batches touched yet");
        return Ok(());
    }

    println!("\nBatches:");
    for batch in &status.batches {
        let archives = batch
            .archives
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {}: cursor {}/{}, {} done",
            batch.batch, batch.cursor, archives, batch.done
        );
    }
    Ok(())
}

/// Handles the --reset mode: clears one batch's resume state
fn handle_reset(config: &Config, batch: &str) -> Result<(), Box<dyn std::error::Error>> {
    let batch = BatchId::from(batch.trim());
    if !BatchId::is_recognized(batch.as_str()) {
        tracing::warn!("{} does not look like a crawl batch id", batch);
    }

    let mut state = FsStateStore::new(config.paths.state_dir())?;
    state.reset(&batch)?;
    println!("✓ Reset resume state for {}", batch);
    Ok(())
}

/// Handles the main sweep operation
async fn handle_sweep(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Root: {} | fingerprints: {}",
        config.paths.root().display(),
        enabled_categories(&config).join(", ")
    );

    match run_sweep(config).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Sweep failed: {}", e);
            Err(e.into())
        }
    }
}

fn enabled_categories(config: &Config) -> Vec<String> {
    let mut names = Vec::new();
    if config.categories.wordpress {
        names.push("wordpress".to_string());
    }
    if config.categories.wix {
        names.push("wix".to_string());
    }
    names.extend(config.fingerprints.iter().map(|f| f.name.clone()));
    names
}

fn year_label(year: Option<i32>) -> String {
    year.map(|y| y.to_string()).unwrap_or_else(|| "*".to_string())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

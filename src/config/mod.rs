//! Configuration module for warc-sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resulting [`Config`] is built once at startup and passed by reference to
//! every component; nothing below this module reads the process environment.
//!
//! # Example
//!
//! ```no_run
//! use warc_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sweep.toml")).unwrap();
//! println!("Sweeping with mode: {}", config.sweep.archives_per_batch);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AuditConfig, CategoryToggles, Config, FingerprintEntry, HttpConfig, PathsConfig, RuleEntry,
    SweepConfig, SweepMode, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;

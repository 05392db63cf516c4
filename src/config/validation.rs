use crate::config::types::{Config, FingerprintEntry, HttpConfig, SweepConfig};
use crate::matcher::{compile_rule, BUILTIN_CATEGORIES};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_sweep_config(&config.sweep)?;
    validate_http_config(&config.http)?;
    validate_fingerprints(&config.fingerprints)?;

    let any_builtin = config.categories.wordpress || config.categories.wix;
    if !any_builtin && config.fingerprints.is_empty() {
        return Err(ConfigError::Validation(
            "at least one fingerprint category must be enabled".to_string(),
        ));
    }

    if config.audit.enabled && config.audit.max_bytes == 0 {
        return Err(ConfigError::Validation(
            "audit max-bytes must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates year range and run limits
fn validate_sweep_config(config: &SweepConfig) -> Result<(), ConfigError> {
    if let (Some(from), Some(to)) = (config.from_year, config.to_year) {
        if from > to {
            return Err(ConfigError::Validation(format!(
                "from-year ({}) must not be after to-year ({})",
                from, to
            )));
        }
    }

    if let Some(start) = &config.start_batch {
        if start.trim().is_empty() {
            return Err(ConfigError::Validation(
                "start-batch cannot be empty".to_string(),
            ));
        }
    }

    if config.max_batches_per_run == Some(0) {
        return Err(ConfigError::Validation(
            "max-batches-per-run must be >= 1".to_string(),
        ));
    }

    if config.max_files_per_run == Some(0) {
        return Err(ConfigError::Validation(
            "max-files-per-run must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP settings and endpoints
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.initial_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "initial-backoff-ms ({}) exceeds max-backoff-ms ({})",
            config.initial_backoff_ms, config.max_backoff_ms
        )));
    }

    Url::parse(&config.catalog_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid catalog-url: {}", e)))?;

    let data_url = Url::parse(&config.data_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid data-url: {}", e)))?;
    if !data_url.path().ends_with('/') {
        return Err(ConfigError::InvalidUrl(format!(
            "data-url must end with '/', got '{}'",
            config.data_url
        )));
    }

    Ok(())
}

/// Validates user-defined fingerprints
fn validate_fingerprints(entries: &[FingerprintEntry]) -> Result<(), ConfigError> {
    let mut names: HashSet<&str> = BUILTIN_CATEGORIES.iter().map(|c| c.name).collect();
    let mut prefixes: HashSet<&str> = BUILTIN_CATEGORIES.iter().map(|c| c.output_prefix).collect();

    for entry in entries {
        if entry.name.is_empty() {
            return Err(ConfigError::Validation(
                "fingerprint name cannot be empty".to_string(),
            ));
        }

        if !names.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate fingerprint name '{}'",
                entry.name
            )));
        }

        validate_output_prefix(&entry.output_prefix)?;
        if !prefixes.insert(entry.output_prefix.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate output-prefix '{}'",
                entry.output_prefix
            )));
        }

        if entry.rules.is_empty() {
            return Err(ConfigError::Validation(format!(
                "fingerprint '{}' must have at least one rule",
                entry.name
            )));
        }

        for rule in &entry.rules {
            compile_rule(&rule.pattern).map_err(|e| ConfigError::InvalidPattern {
                name: format!("{}/{}", entry.name, rule.name),
                message: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Output prefixes become file names, so they must stay within one directory
fn validate_output_prefix(prefix: &str) -> Result<(), ConfigError> {
    let valid = !prefix.is_empty()
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid {
        return Err(ConfigError::Validation(format!(
            "output-prefix must be non-empty and contain only [A-Za-z0-9_-], got '{}'",
            prefix
        )));
    }

    // A trailing digit would make "<prefix>1.txt" ambiguous with the rolling numbers
    if prefix.ends_with(|c: char| c.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "output-prefix must not end with a digit, got '{}'",
            prefix
        )));
    }

    Ok(())
}

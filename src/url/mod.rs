//! URL handling module for warc-sweep
//!
//! Output deduplication is keyed on a normalized host ("domain key") rather
//! than on the full URL, so one site is reported at most once per scope.

mod domain;

pub use domain::{domain_key, extract_domain};

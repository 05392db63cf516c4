use crate::SweepError;
use std::fmt;

/// Prefix shared by every main crawl identifier
pub const BATCH_PREFIX: &str = "CC-MAIN-";

/// Identifier of one crawl batch, e.g. `CC-MAIN-2014-22`
///
/// Identifiers sort lexically in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for identifiers of the main crawl series
    pub fn is_recognized(id: &str) -> bool {
        id.starts_with(BATCH_PREFIX)
    }

    /// Year component of the identifier (third `-`-separated field)
    pub fn year(&self) -> Option<i32> {
        self.0.split('-').nth(2)?.parse().ok()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BatchId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Keeps the batches whose year lies within the optional bounds
///
/// Batches without a parseable year are dropped. Input order is preserved.
pub fn filter_by_year(batches: &[BatchId], from_year: Option<i32>, to_year: Option<i32>) -> Vec<BatchId> {
    batches
        .iter()
        .filter(|batch| match batch.year() {
            None => false,
            Some(year) => {
                from_year.map_or(true, |from| year >= from) && to_year.map_or(true, |to| year <= to)
            }
        })
        .cloned()
        .collect()
}

/// Narrows the catalog to the batches this sweep covers
///
/// An explicit start batch takes precedence over the year range and selects
/// that batch and everything after it.
pub fn select_batches(
    batches: &[BatchId],
    start_batch: Option<&str>,
    from_year: Option<i32>,
    to_year: Option<i32>,
) -> Result<Vec<BatchId>, SweepError> {
    match start_batch {
        Some(start) => batches
            .iter()
            .position(|b| b.as_str() == start)
            .map(|idx| batches[idx..].to_vec())
            .ok_or_else(|| SweepError::UnknownStartBatch(start.to_string())),
        None => Ok(filter_by_year(batches, from_year, to_year)),
    }
}

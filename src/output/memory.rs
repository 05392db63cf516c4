//! In-memory output store for tests

use crate::output::traits::{OutputResult, OutputScope, OutputStore, ScopeWriter, WriteOutcome};
use crate::url::domain_key;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

type Lines = Arc<Mutex<HashMap<OutputScope, Vec<String>>>>;

/// Output store keeping every scope's lines in memory
///
/// Clones share the same underlying lines, so a test can keep one handle and
/// inspect what a controller wrote through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutputStore {
    lines: Lines,
}

impl MemoryOutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written to a scope so far
    pub fn lines(&self, scope: &OutputScope) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
            .cloned()
            .unwrap_or_default()
    }
}

impl OutputStore for MemoryOutputStore {
    fn open(&self, scope: &OutputScope) -> OutputResult<Box<dyn ScopeWriter>> {
        let seen = self
            .lines(scope)
            .iter()
            .map(|line| domain_key(line))
            .filter(|domain| !domain.is_empty())
            .collect();

        Ok(Box::new(MemoryWriter {
            scope: scope.clone(),
            lines: Arc::clone(&self.lines),
            seen,
        }))
    }
}

struct MemoryWriter {
    scope: OutputScope,
    lines: Lines,
    seen: HashSet<String>,
}

impl ScopeWriter for MemoryWriter {
    fn write(&mut self, uri: &str) -> OutputResult<WriteOutcome> {
        let uri = uri.trim();
        let domain = domain_key(uri);
        if domain.is_empty() {
            return Ok(WriteOutcome::NoDomain);
        }
        if !self.seen.insert(domain) {
            return Ok(WriteOutcome::Duplicate);
        }

        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(self.scope.clone())
            .or_default()
            .push(uri.to_string());
        Ok(WriteOutcome::Written)
    }

    fn domain_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveKey;
    use crate::catalog::BatchId;

    #[test]
    fn test_reopened_scope_keeps_dedup() {
        let store = MemoryOutputStore::new();
        let scope = OutputScope::new(
            BatchId::from("CC-MAIN-2022-05"),
            ArchiveKey::new("k"),
            "WP-site",
        );

        let mut writer = store.open(&scope).unwrap();
        assert_eq!(writer.write("http://a.test/").unwrap(), WriteOutcome::Written);
        drop(writer);

        let mut writer = store.open(&scope).unwrap();
        assert_eq!(
            writer.write("http://www.a.test/again").unwrap(),
            WriteOutcome::Duplicate
        );
        assert_eq!(store.lines(&scope), vec!["http://a.test/".to_string()]);
    }
}

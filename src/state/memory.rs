//! In-memory state store used by tests and dry runs

use crate::archive::ArchiveKey;
use crate::catalog::BatchId;
use crate::state::traits::{StateResult, StateStore};
use std::collections::{HashMap, HashSet};

/// Non-persistent state store
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    cursors: HashMap<BatchId, u64>,
    done: HashMap<BatchId, HashSet<ArchiveKey>>,
    global_index: usize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load_cursor(&self, batch: &BatchId) -> u64 {
        self.cursors.get(batch).copied().unwrap_or(0)
    }

    fn save_cursor(&mut self, batch: &BatchId, index: u64) -> StateResult<()> {
        self.cursors.insert(batch.clone(), index);
        Ok(())
    }

    fn load_done_set(&self, batch: &BatchId) -> HashSet<ArchiveKey> {
        self.done.get(batch).cloned().unwrap_or_default()
    }

    fn append_done(&mut self, batch: &BatchId, key: &ArchiveKey) -> StateResult<()> {
        self.done.entry(batch.clone()).or_default().insert(key.clone());
        Ok(())
    }

    fn load_global_index(&self) -> usize {
        self.global_index
    }

    fn save_global_index(&mut self, index: usize) -> StateResult<()> {
        self.global_index = index;
        Ok(())
    }

    fn reset(&mut self, batch: &BatchId) -> StateResult<()> {
        self.cursors.remove(batch);
        self.done.remove(batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_tracks_batches_separately() {
        let mut store = MemoryStateStore::new();
        let a = BatchId::from("CC-MAIN-2019-04");
        let b = BatchId::from("CC-MAIN-2019-09");

        store.save_cursor(&a, 2).unwrap();
        store.append_done(&a, &ArchiveKey::new("x")).unwrap();

        assert_eq!(store.load_cursor(&a), 2);
        assert_eq!(store.load_cursor(&b), 0);
        assert!(store.load_done_set(&b).is_empty());

        store.reset(&a).unwrap();
        assert_eq!(store.load_cursor(&a), 0);
        assert!(store.load_done_set(&a).is_empty());
    }
}

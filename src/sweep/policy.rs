//! Archive selection policy
//!
//! A pure decision over the archive list of one batch and its resume state.
//! The controller performs every side effect; the random source is injected
//! so selections are reproducible under a seeded generator.

use crate::archive::ArchiveKey;
use rand::Rng;
use std::collections::HashSet;

/// Random draws per batch before it is treated as exhausted
pub const RANDOM_ATTEMPTS: usize = 30;

/// What to do next within one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Process the archive at this manifest index
    Process { index: usize, key: ArchiveKey },

    /// Sequential cursor reached the end of the manifest (or it is empty)
    BatchComplete,

    /// Random mode: the done-set already holds the quota
    BatchSatisfied,

    /// Random mode: no unprocessed archive found within the attempt budget
    BatchExhausted,
}

/// Next archive at the cursor
pub fn select_sequential(archives: &[String], cursor: u64) -> Selection {
    let index = match usize::try_from(cursor) {
        Ok(index) if index < archives.len() => index,
        _ => return Selection::BatchComplete,
    };

    Selection::Process {
        index,
        key: ArchiveKey::from_path(&archives[index]),
    }
}

/// Whether a batch already holds its random quota
pub fn quota_satisfied(done: &HashSet<ArchiveKey>, quota: u32) -> bool {
    done.len() >= quota.max(1) as usize
}

/// Uniform draw among archives not yet in the done-set
///
/// Draws are rejection-sampled, so a batch that is nearly fully processed may
/// report [`Selection::BatchExhausted`] while unprocessed archives remain.
pub fn select_random<R: Rng + ?Sized>(
    archives: &[String],
    done: &HashSet<ArchiveKey>,
    quota: u32,
    rng: &mut R,
) -> Selection {
    if quota_satisfied(done, quota) {
        return Selection::BatchSatisfied;
    }
    if archives.is_empty() {
        return Selection::BatchComplete;
    }

    for _ in 0..RANDOM_ATTEMPTS {
        let index = rng.gen_range(0..archives.len());
        let key = ArchiveKey::from_path(&archives[index]);
        if !done.contains(&key) {
            return Selection::Process { index, key };
        }
    }

    Selection::BatchExhausted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn manifest(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                format!(
                    "crawl-data/CC-MAIN-2020-05/segments/1/warc/CC-MAIN-20200117000000-20200117030000-{:05}.warc.gz",
                    i
                )
            })
            .collect()
    }

    #[test]
    fn test_sequential_follows_cursor() {
        let archives = manifest(3);
        assert_eq!(
            select_sequential(&archives, 0),
            Selection::Process {
                index: 0,
                key: ArchiveKey::from_path(&archives[0])
            }
        );
        assert!(matches!(
            select_sequential(&archives, 2),
            Selection::Process { index: 2, .. }
        ));
        assert_eq!(select_sequential(&archives, 3), Selection::BatchComplete);
        assert_eq!(select_sequential(&archives, 99), Selection::BatchComplete);
    }

    #[test]
    fn test_sequential_empty_manifest() {
        assert_eq!(select_sequential(&[], 0), Selection::BatchComplete);
    }

    #[test]
    fn test_random_skips_done_archives() {
        let archives = manifest(2);
        let done: HashSet<ArchiveKey> = archives[..1].iter().map(|p| ArchiveKey::from_path(p)).collect();
        let mut rng = StdRng::seed_from_u64(7);

        match select_random(&archives, &done, 10, &mut rng) {
            Selection::Process { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected selection {:?}", other),
        }
    }

    #[test]
    fn test_random_quota_satisfied() {
        let archives = manifest(10);
        let done: HashSet<ArchiveKey> = archives[..3].iter().map(|p| ArchiveKey::from_path(p)).collect();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            select_random(&archives, &done, 3, &mut rng),
            Selection::BatchSatisfied
        );
    }

    #[test]
    fn test_random_exhausted_when_everything_done() {
        let archives = manifest(2);
        let done: HashSet<ArchiveKey> = archives.iter().map(|p| ArchiveKey::from_path(p)).collect();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            select_random(&archives, &done, 5, &mut rng),
            Selection::BatchExhausted
        );
    }

    #[test]
    fn test_random_quota_reached_over_successive_picks() {
        let archives = manifest(20);
        let mut done = HashSet::new();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..3 {
            match select_random(&archives, &done, 3, &mut rng) {
                Selection::Process { key, .. } => assert!(done.insert(key)),
                other => panic!("unexpected selection {:?}", other),
            }
        }

        assert_eq!(done.len(), 3);
        assert_eq!(
            select_random(&archives, &done, 3, &mut rng),
            Selection::BatchSatisfied
        );
    }

    #[test]
    fn test_same_seed_same_pick() {
        let archives = manifest(50);
        let done = HashSet::new();
        let a = select_random(&archives, &done, 1, &mut StdRng::seed_from_u64(9));
        let b = select_random(&archives, &done, 1, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}

//! The swarm table: a two-level-locked map from info-hash to swarm entry.
//!
//! The outer reader/writer lock protects the table structure; each entry
//! carries its own mutex for hot-path mutation. Workers hold the table lock
//! only long enough to clone the entry handle, then operate on the entry
//! behind its own lock. The entry mutex is never blocking-acquired while the
//! table write lock is held, which rules out lock-order inversions.
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::entry;
use crate::core::info_hash::InfoHash;
use crate::shared::clock::DurationSinceUnixEpoch;

/// What one reaper pass did. See [`Repository::purge_batch`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    /// Number of swarms visited.
    pub visited: usize,
    /// Number of stale peers evicted.
    pub evicted_peers: usize,
    /// Number of swarms removed because they ended up empty.
    pub removed_swarms: usize,
}

/// The in-memory swarm table.
///
/// Swarms are created lazily on the first announce for their info-hash and
/// destroyed by the reaper once they are empty.
#[derive(Default)]
pub struct Repository {
    swarms: RwLock<BTreeMap<InfoHash, entry::Shared>>,
    /// Last key visited by [`Self::purge_batch`]. `None` restarts from the
    /// beginning of the table. Kept as a key, not an iterator, so it
    /// survives concurrent insertions and removals.
    purge_cursor: Mutex<Option<InfoHash>>,
}

impl Repository {
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<InfoHash, entry::Shared>> {
        self.swarms.read().expect("it should get a read lock on the swarm table")
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<InfoHash, entry::Shared>> {
        self.swarms.write().expect("it should get a write lock on the swarm table")
    }

    /// Returns the swarm for `info_hash`, if any. Takes the read lock only.
    #[must_use]
    pub fn get(&self, info_hash: &InfoHash) -> Option<entry::Shared> {
        self.read().get(info_hash).cloned()
    }

    /// Returns the swarm for `info_hash`, creating an empty one if missing.
    ///
    /// The common case is a hit under the read lock; only a miss promotes to
    /// the write lock.
    #[must_use]
    pub fn get_or_create(&self, info_hash: &InfoHash) -> entry::Shared {
        if let Some(existing) = self.read().get(info_hash).cloned() {
            return existing;
        }

        self.write().entry(*info_hash).or_insert_with(Arc::default).clone()
    }

    /// Number of swarms currently in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Expires stale peers in up to `batch` swarms and drops the swarms that
    /// end up empty.
    ///
    /// The pass resumes where the previous one stopped, so a large table is
    /// purged incrementally with a bounded per-tick lock footprint. When the
    /// cursor falls off the end of the table it resets to the beginning for
    /// the next call.
    ///
    /// Peers whose last announce is older than `cutoff` are evicted.
    pub fn purge_batch(&self, cutoff: DurationSinceUnixEpoch, batch: usize) -> PurgeReport {
        let mut cursor = self.purge_cursor.lock().expect("it should get the purge cursor");
        let mut report = PurgeReport::default();

        // Snapshot the handles of the next `batch` swarms under the read
        // lock, then expire without holding any table lock.
        let slice: Vec<(InfoHash, entry::Shared)> = {
            let table = self.read();
            let range = match *cursor {
                Some(last) => table.range((Excluded(last), Unbounded)),
                None => table.range(..),
            };
            range.take(batch).map(|(hash, entry)| (*hash, entry.clone())).collect()
        };

        *cursor = if slice.len() < batch { None } else { slice.last().map(|(hash, _)| *hash) };

        let mut emptied: Vec<InfoHash> = Vec::new();

        for (hash, entry) in &slice {
            let mut entry = entry.lock().expect("it should lock the swarm entry");
            report.visited += 1;
            report.evicted_peers += entry.remove_inactive_peers(cutoff);
            if entry.peers_is_empty() {
                emptied.push(*hash);
            }
        }

        if !emptied.is_empty() {
            let mut table = self.write();
            for hash in emptied {
                // Re-check under the write lock: an announce may have raced
                // the expiry pass. `try_lock` keeps the table -> entry lock
                // order free of blocking; a contended entry is live anyway.
                let still_empty = table
                    .get(&hash)
                    .is_some_and(|entry| entry.try_lock().is_ok_and(|entry| entry.peers_is_empty()));
                if still_empty {
                    table.remove(&hash);
                    report.removed_swarms += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Repository;
    use crate::core::announce_event::AnnounceEvent;
    use crate::core::info_hash::InfoHash;
    use crate::core::peer::fixture::PeerBuilder;
    use crate::shared::clock;

    fn info_hash(n: u8) -> InfoHash {
        InfoHash([n; 20])
    }

    fn repository_with_fresh_peers(swarms: u8) -> Repository {
        let repository = Repository::default();
        for n in 0..swarms {
            let entry = repository.get_or_create(&info_hash(n));
            entry
                .lock()
                .unwrap()
                .upsert_peer(&PeerBuilder::default().build(), AnnounceEvent::Started);
        }
        repository
    }

    #[test]
    fn it_should_create_a_swarm_lazily() {
        let repository = Repository::default();

        assert!(repository.get(&info_hash(1)).is_none());

        let created = repository.get_or_create(&info_hash(1));
        let found = repository.get(&info_hash(1)).unwrap();

        assert!(std::sync::Arc::ptr_eq(&created, &found));
        assert_eq!(repository.len(), 1);
    }

    #[test]
    fn purging_should_evict_stale_peers_and_drop_empty_swarms() {
        let repository = Repository::default();
        let stale = PeerBuilder::default()
            .last_updated_on(clock::now().saturating_sub(Duration::from_secs(7200)))
            .build();
        repository
            .get_or_create(&info_hash(1))
            .lock()
            .unwrap()
            .upsert_peer(&stale, AnnounceEvent::Started);

        let report = repository.purge_batch(clock::now_sub_secs(3600), 20);

        assert_eq!(report.visited, 1);
        assert_eq!(report.evicted_peers, 1);
        assert_eq!(report.removed_swarms, 1);
        assert!(repository.is_empty());
    }

    #[test]
    fn purging_should_keep_swarms_with_fresh_peers() {
        let repository = repository_with_fresh_peers(3);

        let report = repository.purge_batch(clock::now_sub_secs(3600), 20);

        assert_eq!(report.visited, 3);
        assert_eq!(report.evicted_peers, 0);
        assert_eq!(repository.len(), 3);
    }

    #[test]
    fn the_purge_cursor_should_advance_across_calls_and_wrap() {
        let repository = repository_with_fresh_peers(5);
        let cutoff = clock::now_sub_secs(3600);

        assert_eq!(repository.purge_batch(cutoff, 2).visited, 2);
        assert_eq!(repository.purge_batch(cutoff, 2).visited, 2);
        // Only one swarm left before the cursor falls off the end.
        assert_eq!(repository.purge_batch(cutoff, 2).visited, 1);
        // And the next pass starts over from the beginning.
        assert_eq!(repository.purge_batch(cutoff, 2).visited, 2);
    }

    #[test]
    fn the_purge_cursor_should_survive_swarm_removal() {
        let repository = repository_with_fresh_peers(4);
        let cutoff = clock::now_sub_secs(3600);

        assert_eq!(repository.purge_batch(cutoff, 2).visited, 2);

        // Drop a swarm the cursor has already passed.
        let stale = PeerBuilder::default()
            .last_updated_on(clock::now().saturating_sub(Duration::from_secs(7200)))
            .build();
        repository
            .get_or_create(&info_hash(0))
            .lock()
            .unwrap()
            .upsert_peer(&stale, AnnounceEvent::Stopped);

        assert_eq!(repository.purge_batch(cutoff, 2).visited, 2);
    }
}

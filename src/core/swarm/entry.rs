//! The tracker entry for one torrent: the swarm peer set plus the completed
//! downloads counter.
use std::collections::HashMap;
use std::net::SocketAddrV4;
use std::sync::{Arc, Mutex};

use super::SwarmMetadata;
use crate::core::announce_event::AnnounceEvent;
use crate::core::peer::Peer;
use crate::shared::clock::DurationSinceUnixEpoch;

/// A swarm entry behind its own lock, the form in which the
/// [`Repository`](crate::core::swarm::repository::Repository) hands entries
/// to workers.
pub type Shared = Arc<Mutex<Entry>>;

/// All the information about a torrent that the tracker keeps in memory.
///
/// Peers are keyed by their endpoint: a swarm holds at most one registration
/// per `(ip, port)` pair, so `complete + incomplete` always equals the number
/// of stored peers.
#[derive(Debug, Default)]
pub struct Entry {
    peers: HashMap<SocketAddrV4, Peer>,
    /// Number of peers that have ever completed downloading this torrent.
    completed: u32,
    /// Rotating start position for peer sampling.
    cursor: usize,
}

impl Entry {
    /// Inserts or updates a peer, honoring the announce event.
    ///
    /// `Stopped` removes the registration instead. Returns the peer's seed
    /// state before and after the call; for a removed or previously unknown
    /// peer the respective state is `false`.
    ///
    /// The completed-downloads counter increases exactly once per peer
    /// transition into seeding caused by a `Completed` event.
    pub fn upsert_peer(&mut self, peer: &Peer, event: AnnounceEvent) -> (bool, bool) {
        let was_seeder = self.peers.get(&peer.addr).is_some_and(Peer::is_seeder);

        if event == AnnounceEvent::Stopped {
            self.peers.remove(&peer.addr);
            return (was_seeder, false);
        }

        let is_seeder = peer.is_seeder();
        if event == AnnounceEvent::Completed && !was_seeder && is_seeder {
            self.completed += 1;
        }
        self.peers.insert(peer.addr, *peer);

        (was_seeder, is_seeder)
    }

    /// Returns up to `max_n` peer endpoints, excluding `exclude` (the
    /// requesting peer itself).
    ///
    /// Selection starts from a cursor that rotates across calls, so repeat
    /// announcers see an approximately uniform slice of the swarm rather
    /// than always the same prefix of the underlying storage.
    pub fn sample_peers(&mut self, max_n: usize, exclude: &SocketAddrV4) -> Vec<SocketAddrV4> {
        let len = self.peers.len();
        if len == 0 || max_n == 0 {
            return Vec::new();
        }

        let start = self.cursor % len;
        let sample: Vec<SocketAddrV4> = self
            .peers
            .keys()
            .skip(start)
            .chain(self.peers.keys().take(start))
            .filter(|addr| *addr != exclude)
            .take(max_n)
            .copied()
            .collect();

        self.cursor = self.cursor.wrapping_add(sample.len().max(1));

        sample
    }

    /// The swarm statistics: `(downloaded, complete, incomplete)`.
    #[must_use]
    pub fn metadata(&self) -> SwarmMetadata {
        #[allow(clippy::cast_possible_truncation)]
        let complete = self.peers.values().filter(|peer| peer.is_seeder()).count() as u32;
        #[allow(clippy::cast_possible_truncation)]
        let incomplete = self.peers.len() as u32 - complete;

        SwarmMetadata {
            downloaded: self.completed,
            complete,
            incomplete,
        }
    }

    /// Removes every peer whose last announce is older than `cutoff`.
    /// Returns how many were removed.
    pub fn remove_inactive_peers(&mut self, cutoff: DurationSinceUnixEpoch) -> usize {
        let before = self.peers.len();
        self.peers.retain(|_, peer| peer.updated > cutoff);
        before - self.peers.len()
    }

    #[must_use]
    pub fn peers_is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    #[must_use]
    pub fn peers_len(&self) -> usize {
        self.peers.len()
    }
}

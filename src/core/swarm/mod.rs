//! Swarm data and the concurrent swarm table.
//!
//! A swarm is the set of peers downloading or seeding the same torrent. Each
//! swarm is an [`entry::Entry`] behind its own mutex; the table mapping
//! info-hashes to swarms is the [`repository::Repository`].
use derive_more::Constructor;

pub mod entry;
pub mod repository;

/// Swarm statistics for one torrent, as reported in scrape responses.
///
/// See [BEP 48: Tracker Protocol Extension: Scrape](https://www.bittorrent.org/beps/bep_0048.html)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Constructor)]
pub struct SwarmMetadata {
    /// (i.e. `completed`): number of peers that have ever completed downloading.
    pub downloaded: u32,
    /// (i.e. `seeders`): number of active peers that have completed downloading.
    pub complete: u32,
    /// (i.e. `leechers`): number of active peers that have not completed downloading.
    pub incomplete: u32,
}

impl SwarmMetadata {
    #[must_use]
    pub fn zeroed() -> Self {
        Self::default()
    }
}

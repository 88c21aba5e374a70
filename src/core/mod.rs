//! The domain layer of the tracker.
//!
//! The [`Tracker`] service handles `announce` and `scrape` requests against
//! the in-memory swarm table. It is not responsible for the network layer:
//! the UDP server in [`crate::servers::udp`] decodes datagrams, drives the
//! `Tracker` and encodes the replies.
use std::net::SocketAddrV4;

use derive_more::Constructor;

use self::announce_event::AnnounceEvent;
use self::info_hash::InfoHash;
use self::peer::Peer;
use self::statistics::Metrics;
use self::swarm::repository::{PurgeReport, Repository};
use self::swarm::SwarmMetadata;
use crate::config::{Configuration, TrackerPolicy};
use crate::shared::clock;

pub mod announce_event;
pub mod info_hash;
pub mod peer;
pub mod statistics;
pub mod swarm;

/// How many swarms one reaper pass touches. Amortizes purge cost and bounds
/// the per-tick lock footprint on large tables.
const PURGE_BATCH: usize = 20;

/// The tracker service.
///
/// It owns the swarm table and the usage counters, and it is shared by all
/// worker threads plus the supervisor. The configuration is copied in at
/// startup and read-only afterwards.
pub struct Tracker {
    policy: TrackerPolicy,
    allow_alternate_ip: bool,
    /// The swarm table.
    pub swarms: Repository,
    /// Usage counters, sampled once per minute by the supervisor.
    pub stats: Metrics,
}

/// The data returned by an `announce` request.
#[derive(Clone, Debug, PartialEq, Eq, Constructor, Default)]
pub struct AnnounceData {
    /// Other peers in the swarm, excluding the announcing peer.
    pub peers: Vec<SocketAddrV4>,
    /// Swarm statistics after the announce was applied.
    pub stats: SwarmMetadata,
}

/// The data returned by a `scrape` request: one metadata triple per
/// requested info-hash, in request order. Unknown torrents scrape as zero.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ScrapeData {
    pub files: Vec<SwarmMetadata>,
}

impl Tracker {
    #[must_use]
    pub fn new(config: &Configuration) -> Self {
        Self {
            policy: config.policy.clone(),
            allow_alternate_ip: config.udp_tracker.allow_alternate_ip,
            swarms: Repository::default(),
            stats: Metrics::default(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &TrackerPolicy {
        &self.policy
    }

    /// Whether announces may carry a source address other than the one the
    /// datagram came from. Off by default since it allows spoofing.
    #[must_use]
    pub fn allow_alternate_ip(&self) -> bool {
        self.allow_alternate_ip
    }

    /// Handles an announce: registers (or removes, on `Stopped`) the peer in
    /// the swarm and samples other peers for the reply.
    ///
    /// `num_want` is the client's wish; it is capped by
    /// `max_peers_per_announce_reply`, and a negative value means "no
    /// preference".
    pub fn announce(&self, info_hash: &InfoHash, peer: &Peer, event: AnnounceEvent, num_want: i32) -> AnnounceData {
        let cap = self.policy.max_peers_per_announce_reply;
        #[allow(clippy::cast_sign_loss)]
        let limit = if num_want < 0 {
            cap
        } else {
            std::cmp::min(num_want as usize, cap)
        };

        let entry = self.swarms.get_or_create(info_hash);
        let mut entry = entry.lock().expect("it should lock the swarm entry");

        entry.upsert_peer(peer, event);
        let peers = entry.sample_peers(limit, &peer.addr);
        let stats = entry.metadata();

        AnnounceData { peers, stats }
    }

    /// Handles a scrape: one `(complete, downloaded, incomplete)` triple per
    /// info-hash. The caller is expected to have truncated the hash list to
    /// `max_scrape_responses` already (the codec does).
    #[must_use]
    pub fn scrape(&self, info_hashes: &[InfoHash]) -> ScrapeData {
        let files = info_hashes
            .iter()
            .map(|info_hash| match self.swarms.get(info_hash) {
                Some(entry) => entry.lock().expect("it should lock the swarm entry").metadata(),
                None => SwarmMetadata::zeroed(),
            })
            .collect();

        ScrapeData { files }
    }

    /// One reaper pass: evicts peers older than `peer_ttl` from the next
    /// [`PURGE_BATCH`] swarms and drops swarms that end up empty.
    pub fn purge_inactive_peers(&self) -> PurgeReport {
        let cutoff = clock::now_sub_secs(u64::from(self.policy.peer_ttl));
        self.swarms.purge_batch(cutoff, PURGE_BATCH)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddrV4};
    use std::time::Duration;

    use super::announce_event::AnnounceEvent;
    use super::info_hash::InfoHash;
    use super::peer::fixture::PeerBuilder;
    use super::Tracker;
    use crate::config::Configuration;
    use crate::shared::clock;

    fn public_tracker() -> Tracker {
        Tracker::new(&Configuration::default())
    }

    fn sample_info_hash() -> InfoHash {
        InfoHash([0x11; 20])
    }

    fn addr(last_octet: u8, port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, last_octet), port)
    }

    #[test]
    fn the_first_announce_should_see_an_otherwise_empty_swarm() {
        let tracker = public_tracker();
        let peer = PeerBuilder::leecher().with_addr(addr(1, 6881)).build();

        let data = tracker.announce(&sample_info_hash(), &peer, AnnounceEvent::Started, 50);

        assert!(data.peers.is_empty());
        assert_eq!(data.stats.incomplete, 1);
        assert_eq!(data.stats.complete, 0);
    }

    #[test]
    fn a_second_peer_should_be_offered_the_first_one() {
        let tracker = public_tracker();
        let first = PeerBuilder::leecher().with_addr(addr(1, 6881)).build();
        let second = PeerBuilder::seeder().with_addr(addr(2, 7000)).build();

        tracker.announce(&sample_info_hash(), &first, AnnounceEvent::Started, 50);
        let data = tracker.announce(&sample_info_hash(), &second, AnnounceEvent::Started, 50);

        assert_eq!(data.peers, vec![addr(1, 6881)]);
        assert_eq!(data.stats.complete, 1);
        assert_eq!(data.stats.incomplete, 1);
    }

    #[test]
    fn the_reply_should_never_exceed_num_want() {
        let tracker = public_tracker();
        for i in 1..=10u8 {
            let peer = PeerBuilder::leecher().with_addr(addr(i, 6881)).build();
            tracker.announce(&sample_info_hash(), &peer, AnnounceEvent::Started, 0);
        }
        let asker = PeerBuilder::leecher().with_addr(addr(100, 6881)).build();

        let data = tracker.announce(&sample_info_hash(), &asker, AnnounceEvent::None, 3);

        assert_eq!(data.peers.len(), 3);
    }

    #[test]
    fn a_negative_num_want_should_mean_no_preference() {
        let tracker = public_tracker();
        for i in 1..=5u8 {
            let peer = PeerBuilder::leecher().with_addr(addr(i, 6881)).build();
            tracker.announce(&sample_info_hash(), &peer, AnnounceEvent::Started, 0);
        }
        let asker = PeerBuilder::leecher().with_addr(addr(100, 6881)).build();

        let data = tracker.announce(&sample_info_hash(), &asker, AnnounceEvent::None, -1);

        assert_eq!(data.peers.len(), 5);
    }

    #[test]
    fn a_stopped_announce_should_remove_the_peer_from_the_swarm() {
        let tracker = public_tracker();
        let peer = PeerBuilder::leecher().with_addr(addr(1, 6881)).build();

        tracker.announce(&sample_info_hash(), &peer, AnnounceEvent::Started, 50);
        tracker.announce(&sample_info_hash(), &peer, AnnounceEvent::Stopped, 50);

        let data = tracker.scrape(&[sample_info_hash()]);

        assert_eq!(data.files[0].incomplete, 0);
    }

    #[test]
    fn scraping_an_unknown_torrent_should_return_zeros() {
        let tracker = public_tracker();

        let data = tracker.scrape(&[sample_info_hash()]);

        assert_eq!(data.files.len(), 1);
        assert_eq!(data.files[0], crate::core::swarm::SwarmMetadata::zeroed());
    }

    #[test]
    fn scrape_triples_should_come_back_in_request_order() {
        let tracker = public_tracker();
        let peer = PeerBuilder::seeder().with_addr(addr(1, 6881)).build();
        let populated = InfoHash([0x22; 20]);

        tracker.announce(&populated, &peer, AnnounceEvent::Started, 0);

        let data = tracker.scrape(&[sample_info_hash(), populated]);

        assert_eq!(data.files[0].complete, 0);
        assert_eq!(data.files[1].complete, 1);
    }

    #[test]
    fn purging_should_evict_peers_past_their_ttl() {
        let tracker = public_tracker();
        let ttl = u64::from(tracker.policy().peer_ttl);
        let stale = PeerBuilder::leecher()
            .with_addr(addr(1, 6881))
            .last_updated_on(clock::now().saturating_sub(Duration::from_secs(ttl + 60)))
            .build();

        tracker.announce(&sample_info_hash(), &stale, AnnounceEvent::Started, 0);
        let report = tracker.purge_inactive_peers();

        assert_eq!(report.evicted_peers, 1);
        assert_eq!(report.removed_swarms, 1);
        assert!(tracker.swarms.is_empty());
    }
}

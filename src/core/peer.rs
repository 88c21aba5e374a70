//! Peer structs used by the core [`Tracker`](crate::core::Tracker).
//!
//! A peer is identified inside a swarm by its endpoint (IPv4 address and
//! port), not by its peer id: the id is carried opaquely and returned to
//! nobody, it only exists for logging.
use std::net::SocketAddrV4;

use serde::Serialize;

use crate::shared::clock::DurationSinceUnixEpoch;

/// Number of bytes of a peer id.
pub const PEER_ID_BYTES_LEN: usize = 20;

/// Opaque 20-byte peer id chosen by the client.
///
/// The tracker stores it but never interprets it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(pub [u8; PEER_ID_BYTES_LEN]);

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chars = [0u8; PEER_ID_BYTES_LEN * 2];
        binascii::bin2hex(&self.0, &mut chars).expect("it should fit in the output buffer");
        write!(f, "0x{}", std::str::from_utf8(&chars).expect("hex digits are valid utf8"))
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Id({self})")
    }
}

impl Serialize for Id {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A peer's registration in a swarm.
///
/// A sample peer:
///
/// ```rust
/// use std::net::{Ipv4Addr, SocketAddrV4};
/// use udp_tracker::core::peer::{Id, Peer};
/// use udp_tracker::shared::clock;
///
/// Peer {
///     peer_id: Id(*b"-qB00000000000000000"),
///     addr: SocketAddrV4::new(Ipv4Addr::new(126, 0, 0, 1), 8080),
///     updated: clock::now(),
///     left: 0,
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Peer {
    /// ID used by the downloader peer.
    pub peer_id: Id,
    /// The IPv4 address and port this peer is listening on.
    pub addr: SocketAddrV4,
    /// Last time the tracker received an announce from this peer.
    pub updated: DurationSinceUnixEpoch,
    /// Number of bytes the peer still has to download.
    pub left: u64,
}

impl Peer {
    /// A peer that has nothing left to download is a seeder.
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.left == 0
    }
}

pub mod fixture {
    use std::net::{Ipv4Addr, SocketAddrV4};

    use super::{Id, Peer};
    use crate::shared::clock::{self, DurationSinceUnixEpoch};

    #[derive(Debug)]
    pub struct PeerBuilder {
        peer: Peer,
    }

    impl Default for PeerBuilder {
        fn default() -> Self {
            Self {
                peer: Peer {
                    peer_id: Id(*b"-qB00000000000000000"),
                    addr: SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 8080),
                    updated: clock::now(),
                    left: 0,
                },
            }
        }
    }

    impl PeerBuilder {
        #[must_use]
        pub fn seeder() -> Self {
            Self::default().with_left(0)
        }

        #[must_use]
        pub fn leecher() -> Self {
            Self::default().with_left(1000)
        }

        #[must_use]
        pub fn with_peer_id(mut self, peer_id: Id) -> Self {
            self.peer.peer_id = peer_id;
            self
        }

        #[must_use]
        pub fn with_addr(mut self, addr: SocketAddrV4) -> Self {
            self.peer.addr = addr;
            self
        }

        #[must_use]
        pub fn with_left(mut self, left: u64) -> Self {
            self.peer.left = left;
            self
        }

        #[must_use]
        pub fn last_updated_on(mut self, updated: DurationSinceUnixEpoch) -> Self {
            self.peer.updated = updated;
            self
        }

        #[must_use]
        pub fn build(self) -> Peer {
            self.peer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::PeerBuilder;
    use super::Id;

    #[test]
    fn a_peer_with_no_bytes_left_is_a_seeder() {
        assert!(PeerBuilder::seeder().build().is_seeder());
        assert!(!PeerBuilder::leecher().build().is_seeder());
    }

    #[test]
    fn a_peer_id_should_be_displayed_as_hex() {
        let id = Id(*b"-qB00000000000000000");

        assert_eq!(id.to_string(), "0x2d71423030303030303030303030303030303030");
    }
}

//! `BitTorrent` UDP tracker server.
//!
//! Protocol specification:
//! [BEP 15](https://www.bittorrent.org/beps/bep_0015.html)
//!
//! The wire format is the 4-byte-address (IPv4) variant. All multi-byte
//! integers are big-endian.
pub mod connection_cookie;
pub mod error;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

/// Receive buffer size. Larger datagrams are truncated by the kernel, which
/// in particular trims oversized scrape requests for free.
pub const MAX_PACKET_SIZE: usize = 1500;

/// The magic constant every initial `connect` request must carry in its
/// `connection_id` field.
pub const PROTOCOL_ID: u64 = 0x0417_2710_1980;

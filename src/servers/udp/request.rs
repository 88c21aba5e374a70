//! Inbound BEP 15 frames.
//!
//! Every request starts with the same 16-byte header:
//!
//! ```text
//! offset  size  field
//!      0     8  connection_id
//!      8     4  action          (0 connect, 1 announce, 2 scrape)
//!     12     4  transaction_id
//! ```
//!
//! The announce body is fixed-layout. The canonical announce is 100 bytes,
//! but the trailing 2-byte extensions field is optional on the wire (some
//! mainstream clients omit it), so anything from 98 bytes up is accepted and
//! trailing bytes are ignored.
use std::io::{self, Cursor, Read, Write};
use std::net::Ipv4Addr;

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};

use super::error::Error;
use crate::core::announce_event::AnnounceEvent;
use crate::core::info_hash::InfoHash;
use crate::core::peer;

/// Minimum size of an announce request: the canonical 100 bytes minus the
/// optional extensions field.
const ANNOUNCE_MIN_SIZE: usize = 98;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub connection_id: u64,
    pub transaction_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub connection_id: u64,
    pub transaction_id: u32,
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    pub bytes_downloaded: u64,
    pub bytes_left: u64,
    pub bytes_uploaded: u64,
    pub event: AnnounceEvent,
    /// The address the peer asks to be announced under. `None` when the
    /// field is zero, meaning the datagram's source address.
    pub ip_address: Option<Ipv4Addr>,
    pub key: u32,
    /// How many peers the client wants in the reply. Negative means no
    /// preference.
    pub peers_wanted: i32,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub connection_id: u64,
    pub transaction_id: u32,
    pub info_hashes: Vec<InfoHash>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Connect(ConnectRequest),
    Announce(AnnounceRequest),
    Scrape(ScrapeRequest),
}

impl From<ConnectRequest> for Request {
    fn from(r: ConnectRequest) -> Self {
        Self::Connect(r)
    }
}

impl From<AnnounceRequest> for Request {
    fn from(r: AnnounceRequest) -> Self {
        Self::Announce(r)
    }
}

impl From<ScrapeRequest> for Request {
    fn from(r: ScrapeRequest) -> Self {
        Self::Scrape(r)
    }
}

impl Request {
    /// Parses a request datagram.
    ///
    /// A scrape with more than `max_scrape_torrents` hashes is not an error:
    /// only the first `max_scrape_torrents` are kept.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the frame is shorter than its action requires or
    /// the action is unknown. The connection id is *not* validated here;
    /// that is the dispatcher's job.
    pub fn from_bytes(bytes: &[u8], max_scrape_torrents: usize) -> Result<Self, Error> {
        if bytes.len() < 16 {
            return Err(Error::MalformedFrame { len: bytes.len() });
        }

        let mut cursor = Cursor::new(bytes);
        let connection_id = cursor.read_u64::<NetworkEndian>().expect("it should read from the header");
        let action = cursor.read_u32::<NetworkEndian>().expect("it should read from the header");
        let transaction_id = cursor.read_u32::<NetworkEndian>().expect("it should read from the header");

        match action {
            // Connect
            0 => Ok(ConnectRequest {
                connection_id,
                transaction_id,
            }
            .into()),

            // Announce
            1 => {
                if bytes.len() < ANNOUNCE_MIN_SIZE {
                    return Err(Error::MalformedFrame { len: bytes.len() });
                }

                let mut info_hash = [0u8; 20];
                let mut peer_id = [0u8; 20];
                let mut ip = [0u8; 4];

                let body = |_: io::Error| Error::MalformedFrame { len: bytes.len() };

                cursor.read_exact(&mut info_hash).map_err(body)?;
                cursor.read_exact(&mut peer_id).map_err(body)?;
                let bytes_downloaded = cursor.read_u64::<NetworkEndian>().map_err(body)?;
                let bytes_left = cursor.read_u64::<NetworkEndian>().map_err(body)?;
                let bytes_uploaded = cursor.read_u64::<NetworkEndian>().map_err(body)?;
                let event = cursor.read_u32::<NetworkEndian>().map_err(body)?;
                cursor.read_exact(&mut ip).map_err(body)?;
                let key = cursor.read_u32::<NetworkEndian>().map_err(body)?;
                let peers_wanted = cursor.read_i32::<NetworkEndian>().map_err(body)?;
                let port = cursor.read_u16::<NetworkEndian>().map_err(body)?;

                let ip_address = if ip == [0u8; 4] { None } else { Some(Ipv4Addr::from(ip)) };

                Ok(AnnounceRequest {
                    connection_id,
                    transaction_id,
                    info_hash: InfoHash(info_hash),
                    peer_id: peer::Id(peer_id),
                    bytes_downloaded,
                    bytes_left,
                    bytes_uploaded,
                    event: AnnounceEvent::from_u32(event),
                    ip_address,
                    key,
                    peers_wanted,
                    port,
                }
                .into())
            }

            // Scrape
            2 => {
                let remaining = &bytes[16..];
                let num_hashes = std::cmp::min(remaining.len() / 20, max_scrape_torrents);

                if num_hashes == 0 {
                    return Err(Error::MalformedFrame { len: bytes.len() });
                }

                let info_hashes = remaining
                    .chunks_exact(20)
                    .take(num_hashes)
                    .map(|chunk| InfoHash::try_from(chunk).expect("chunks are exactly 20 bytes"))
                    .collect();

                Ok(ScrapeRequest {
                    connection_id,
                    transaction_id,
                    info_hashes,
                }
                .into())
            }

            _ => Err(Error::UnknownAction { action }),
        }
    }

    /// Writes the request in wire format. This is the client side of the
    /// codec, used by the test suite and by tracker health checks.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the underlying writer fails.
    pub fn write(&self, bytes: &mut impl Write) -> io::Result<()> {
        match self {
            Request::Connect(r) => {
                bytes.write_u64::<NetworkEndian>(r.connection_id)?;
                bytes.write_u32::<NetworkEndian>(0)?;
                bytes.write_u32::<NetworkEndian>(r.transaction_id)?;
            }

            Request::Announce(r) => {
                bytes.write_u64::<NetworkEndian>(r.connection_id)?;
                bytes.write_u32::<NetworkEndian>(1)?;
                bytes.write_u32::<NetworkEndian>(r.transaction_id)?;

                bytes.write_all(&r.info_hash.0)?;
                bytes.write_all(&r.peer_id.0)?;

                bytes.write_u64::<NetworkEndian>(r.bytes_downloaded)?;
                bytes.write_u64::<NetworkEndian>(r.bytes_left)?;
                bytes.write_u64::<NetworkEndian>(r.bytes_uploaded)?;

                bytes.write_u32::<NetworkEndian>(r.event.to_u32())?;
                bytes.write_all(&r.ip_address.map_or([0u8; 4], |ip| ip.octets()))?;
                bytes.write_u32::<NetworkEndian>(r.key)?;
                bytes.write_i32::<NetworkEndian>(r.peers_wanted)?;
                bytes.write_u16::<NetworkEndian>(r.port)?;
            }

            Request::Scrape(r) => {
                bytes.write_u64::<NetworkEndian>(r.connection_id)?;
                bytes.write_u32::<NetworkEndian>(2)?;
                bytes.write_u32::<NetworkEndian>(r.transaction_id)?;

                for info_hash in &r.info_hashes {
                    bytes.write_all(&info_hash.0)?;
                }
            }
        }

        Ok(())
    }
}

//! Outbound BEP 15 frames.
//!
//! Responses open with `action (u32) | transaction_id (u32)`, followed by an
//! action-specific body. Peers travel in compact form: 4 address bytes then
//! 2 port bytes, big-endian, concatenated without separators.
use std::io::{self, Cursor, Read, Write};
use std::net::{Ipv4Addr, SocketAddrV4};

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};

use super::error::Error;

/// Longest error message a BEP 15 error response may carry.
pub const MAX_ERROR_MESSAGE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectResponse {
    pub transaction_id: u32,
    pub connection_id: u64,
}

/// A peer in the compact 6-byte encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsePeer {
    pub ip_address: Ipv4Addr,
    pub port: u16,
}

impl From<SocketAddrV4> for ResponsePeer {
    fn from(addr: SocketAddrV4) -> Self {
        Self {
            ip_address: *addr.ip(),
            port: addr.port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceResponse {
    pub transaction_id: u32,
    /// Seconds the client should wait before the next announce.
    pub interval: u32,
    pub leechers: u32,
    pub seeders: u32,
    pub peers: Vec<ResponsePeer>,
}

/// One swarm's population triple in a scrape response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TorrentScrapeStatistics {
    pub seeders: u32,
    pub completed: u32,
    pub leechers: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeResponse {
    pub transaction_id: u32,
    pub torrent_stats: Vec<TorrentScrapeStatistics>,
}

/// BEP 15 error response. The codec supports it for completeness; the
/// dispatcher drops bad requests silently instead of emitting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub transaction_id: u32,
    pub message: String,
}

impl ErrorResponse {
    /// Builds an error response, truncating the message to
    /// [`MAX_ERROR_MESSAGE_LEN`] ASCII bytes.
    #[must_use]
    pub fn new(transaction_id: u32, message: &str) -> Self {
        let message = message
            .chars()
            .filter(char::is_ascii)
            .take(MAX_ERROR_MESSAGE_LEN)
            .collect();
        Self { transaction_id, message }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Connect(ConnectResponse),
    Announce(AnnounceResponse),
    Scrape(ScrapeResponse),
    Error(ErrorResponse),
}

impl From<ConnectResponse> for Response {
    fn from(r: ConnectResponse) -> Self {
        Self::Connect(r)
    }
}

impl From<AnnounceResponse> for Response {
    fn from(r: AnnounceResponse) -> Self {
        Self::Announce(r)
    }
}

impl From<ScrapeResponse> for Response {
    fn from(r: ScrapeResponse) -> Self {
        Self::Scrape(r)
    }
}

impl From<ErrorResponse> for Response {
    fn from(r: ErrorResponse) -> Self {
        Self::Error(r)
    }
}

impl Response {
    /// Writes the response in wire format.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the underlying writer fails, e.g. when the
    /// response does not fit in the caller's buffer.
    pub fn write(&self, bytes: &mut impl Write) -> io::Result<()> {
        match self {
            Response::Connect(r) => {
                bytes.write_u32::<NetworkEndian>(0)?;
                bytes.write_u32::<NetworkEndian>(r.transaction_id)?;
                bytes.write_u64::<NetworkEndian>(r.connection_id)?;
            }

            Response::Announce(r) => {
                bytes.write_u32::<NetworkEndian>(1)?;
                bytes.write_u32::<NetworkEndian>(r.transaction_id)?;
                bytes.write_u32::<NetworkEndian>(r.interval)?;
                bytes.write_u32::<NetworkEndian>(r.leechers)?;
                bytes.write_u32::<NetworkEndian>(r.seeders)?;

                for peer in &r.peers {
                    bytes.write_all(&peer.ip_address.octets())?;
                    bytes.write_u16::<NetworkEndian>(peer.port)?;
                }
            }

            Response::Scrape(r) => {
                bytes.write_u32::<NetworkEndian>(2)?;
                bytes.write_u32::<NetworkEndian>(r.transaction_id)?;

                for stats in &r.torrent_stats {
                    bytes.write_u32::<NetworkEndian>(stats.seeders)?;
                    bytes.write_u32::<NetworkEndian>(stats.completed)?;
                    bytes.write_u32::<NetworkEndian>(stats.leechers)?;
                }
            }

            Response::Error(r) => {
                bytes.write_u32::<NetworkEndian>(3)?;
                bytes.write_u32::<NetworkEndian>(r.transaction_id)?;
                bytes.write_all(r.message.as_bytes())?;
            }
        }

        Ok(())
    }

    /// Parses a response datagram. This is the client side of the codec,
    /// used by the test suite and by tracker health checks.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the frame is shorter than its action requires or
    /// the action is unknown.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < 8 {
            return Err(Error::MalformedFrame { len: bytes.len() });
        }

        let mut cursor = Cursor::new(bytes);
        let action = cursor.read_u32::<NetworkEndian>().expect("it should read from the header");
        let transaction_id = cursor.read_u32::<NetworkEndian>().expect("it should read from the header");

        let truncated = |_: io::Error| Error::MalformedFrame { len: bytes.len() };

        match action {
            // Connect
            0 => {
                let connection_id = cursor.read_u64::<NetworkEndian>().map_err(truncated)?;

                Ok(ConnectResponse {
                    transaction_id,
                    connection_id,
                }
                .into())
            }

            // Announce
            1 => {
                let interval = cursor.read_u32::<NetworkEndian>().map_err(truncated)?;
                let leechers = cursor.read_u32::<NetworkEndian>().map_err(truncated)?;
                let seeders = cursor.read_u32::<NetworkEndian>().map_err(truncated)?;

                let mut peers = Vec::new();
                for chunk in bytes[20..].chunks_exact(6) {
                    peers.push(ResponsePeer {
                        ip_address: Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]),
                        port: u16::from_be_bytes([chunk[4], chunk[5]]),
                    });
                }

                Ok(AnnounceResponse {
                    transaction_id,
                    interval,
                    leechers,
                    seeders,
                    peers,
                }
                .into())
            }

            // Scrape
            2 => {
                let mut torrent_stats = Vec::new();
                for _ in 0..bytes[8..].len() / 12 {
                    torrent_stats.push(TorrentScrapeStatistics {
                        seeders: cursor.read_u32::<NetworkEndian>().map_err(truncated)?,
                        completed: cursor.read_u32::<NetworkEndian>().map_err(truncated)?,
                        leechers: cursor.read_u32::<NetworkEndian>().map_err(truncated)?,
                    });
                }

                Ok(ScrapeResponse {
                    transaction_id,
                    torrent_stats,
                }
                .into())
            }

            // Error
            3 => {
                let mut message = String::new();
                cursor.read_to_string(&mut message).map_err(truncated)?;

                Ok(ErrorResponse { transaction_id, message }.into())
            }

            _ => Err(Error::UnknownAction { action }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::{
        AnnounceResponse, ConnectResponse, ErrorResponse, Response, ResponsePeer, ScrapeResponse,
        TorrentScrapeStatistics,
    };

    fn to_bytes(response: &Response) -> Vec<u8> {
        let mut bytes = Vec::new();
        response.write(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn a_connect_response_should_round_trip() {
        let response = Response::from(ConnectResponse {
            transaction_id: 0xDEAD_BEEF,
            connection_id: 0x0102_0304_0506_0708,
        });

        let bytes = to_bytes(&response);

        assert_eq!(bytes.len(), 16);
        assert_eq!(Response::from_bytes(&bytes).unwrap(), response);
    }

    #[test]
    fn an_announce_response_should_round_trip() {
        let response = Response::from(AnnounceResponse {
            transaction_id: 7,
            interval: 1800,
            leechers: 1,
            seeders: 2,
            peers: vec![
                ResponsePeer {
                    ip_address: Ipv4Addr::new(10, 0, 0, 1),
                    port: 6881,
                },
                ResponsePeer {
                    ip_address: Ipv4Addr::new(10, 0, 0, 2),
                    port: 7000,
                },
            ],
        });

        let bytes = to_bytes(&response);

        assert_eq!(bytes.len(), 20 + 2 * 6);
        assert_eq!(Response::from_bytes(&bytes).unwrap(), response);
    }

    #[test]
    fn announce_peers_should_use_the_compact_encoding() {
        let response = Response::from(AnnounceResponse {
            transaction_id: 7,
            interval: 1800,
            leechers: 0,
            seeders: 0,
            peers: vec![ResponsePeer {
                ip_address: Ipv4Addr::new(10, 0, 0, 1),
                port: 6881,
            }],
        });

        let bytes = to_bytes(&response);

        assert_eq!(&bytes[20..26], &[10, 0, 0, 1, 0x1A, 0xE1]);
    }

    #[test]
    fn a_scrape_response_should_round_trip() {
        let response = Response::from(ScrapeResponse {
            transaction_id: 9,
            torrent_stats: vec![
                TorrentScrapeStatistics {
                    seeders: 1,
                    completed: 2,
                    leechers: 3,
                },
                TorrentScrapeStatistics::default(),
            ],
        });

        let bytes = to_bytes(&response);

        assert_eq!(bytes.len(), 8 + 2 * 12);
        assert_eq!(Response::from_bytes(&bytes).unwrap(), response);
    }

    #[test]
    fn an_error_response_should_round_trip() {
        let response = Response::from(ErrorResponse::new(3, "access denied"));

        assert_eq!(Response::from_bytes(&to_bytes(&response)).unwrap(), response);
    }

    #[test]
    fn an_error_message_should_be_truncated_to_64_ascii_bytes() {
        let response = ErrorResponse::new(3, &"x".repeat(100));

        assert_eq!(response.message.len(), 64);
    }

    #[test]
    fn a_truncated_connect_response_should_be_rejected() {
        let response = Response::from(ConnectResponse {
            transaction_id: 1,
            connection_id: 2,
        });
        let bytes = to_bytes(&response);

        assert!(Response::from_bytes(&bytes[..12]).is_err());
    }
}

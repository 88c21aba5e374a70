//! Handlers for the three UDP tracker requests.
//!
//! A handler returns `Some(response)` or, for anything that must be dropped
//! (malformed frame, unknown action, bad cookie), `None` after bumping the
//! `errors` counter. Dropping without a reply keeps the tracker useless as a
//! reflection amplifier: an unverified source never receives more bytes than
//! it sent.
use std::net::SocketAddrV4;

use log::debug;
use rand::Rng;

use super::connection_cookie::ConnectionCookie;
use super::error::Error;
use super::request::{AnnounceRequest, ConnectRequest, Request, ScrapeRequest};
use super::response::{
    AnnounceResponse, ConnectResponse, Response, ResponsePeer, ScrapeResponse, TorrentScrapeStatistics,
};
use super::PROTOCOL_ID;
use crate::core::peer::Peer;
use crate::core::Tracker;
use crate::shared::clock;

/// Spread applied to the base announce interval, in seconds. Replies carry a
/// uniform draw from `[base - 120, base + 120]` so that a burst of new peers
/// does not come back in one burst forever.
const INTERVAL_JITTER: u32 = 120;

/// Decodes and dispatches one datagram. Returns the response to send back,
/// or `None` when the datagram is dropped.
pub fn handle_packet(payload: &[u8], remote_addr: SocketAddrV4, tracker: &Tracker, cookie: &ConnectionCookie) -> Option<Response> {
    match Request::from_bytes(payload, tracker.policy().max_scrape_responses) {
        Ok(Request::Connect(r)) => handle_connect(remote_addr, &r, tracker, cookie),
        Ok(Request::Announce(r)) => handle_announce(remote_addr, &r, tracker, cookie),
        Ok(Request::Scrape(r)) => handle_scrape(remote_addr, &r, tracker, cookie),
        Err(reason) => drop_request(&reason, remote_addr, tracker),
    }
}

/// The one exit for every rejected datagram: count it, log why, send
/// nothing.
fn drop_request(reason: &Error, remote_addr: SocketAddrV4, tracker: &Tracker) -> Option<Response> {
    debug!("dropping datagram from {remote_addr}: {reason}");
    tracker.stats.increase_errors();
    None
}

fn handle_connect(
    remote_addr: SocketAddrV4,
    request: &ConnectRequest,
    tracker: &Tracker,
    cookie: &ConnectionCookie,
) -> Option<Response> {
    if request.connection_id != PROTOCOL_ID {
        return drop_request(&Error::BadCookie, remote_addr, tracker);
    }

    tracker.stats.increase_connects();

    Some(
        ConnectResponse {
            transaction_id: request.transaction_id,
            connection_id: cookie.mint(&remote_addr),
        }
        .into(),
    )
}

fn handle_announce(
    remote_addr: SocketAddrV4,
    request: &AnnounceRequest,
    tracker: &Tracker,
    cookie: &ConnectionCookie,
) -> Option<Response> {
    if !cookie.verify(request.connection_id, &remote_addr) {
        return drop_request(&Error::BadCookie, remote_addr, tracker);
    }

    // A client may only announce under a different address than the one it
    // sent from when the operator opted into that (it enables spoofing).
    let ip = match request.ip_address {
        Some(ip) if tracker.allow_alternate_ip() => ip,
        _ => *remote_addr.ip(),
    };

    let peer = Peer {
        peer_id: request.peer_id,
        addr: SocketAddrV4::new(ip, request.port),
        updated: clock::now(),
        left: request.bytes_left,
    };

    let data = tracker.announce(&request.info_hash, &peer, request.event, request.peers_wanted);

    tracker.stats.increase_announces();

    Some(
        AnnounceResponse {
            transaction_id: request.transaction_id,
            interval: announce_interval(tracker.policy().announce_interval),
            leechers: data.stats.incomplete,
            seeders: data.stats.complete,
            peers: data.peers.into_iter().map(ResponsePeer::from).collect(),
        }
        .into(),
    )
}

fn handle_scrape(
    remote_addr: SocketAddrV4,
    request: &ScrapeRequest,
    tracker: &Tracker,
    cookie: &ConnectionCookie,
) -> Option<Response> {
    if !cookie.verify(request.connection_id, &remote_addr) {
        return drop_request(&Error::BadCookie, remote_addr, tracker);
    }

    let data = tracker.scrape(&request.info_hashes);

    tracker.stats.increase_scrapes();

    Some(
        ScrapeResponse {
            transaction_id: request.transaction_id,
            torrent_stats: data
                .files
                .iter()
                .map(|stats| TorrentScrapeStatistics {
                    seeders: stats.complete,
                    completed: stats.downloaded,
                    leechers: stats.incomplete,
                })
                .collect(),
        }
        .into(),
    )
}

fn announce_interval(base: u32) -> u32 {
    rand::thread_rng().gen_range(base.saturating_sub(INTERVAL_JITTER)..=base + INTERVAL_JITTER)
}

//! A lean, high-throughput UDP `BitTorrent` tracker.
//!
//! The tracker implements [BEP 15](https://www.bittorrent.org/beps/bep_0015.html),
//! the UDP tracker protocol, for IPv4 peers:
//!
//! - The stateless connection-ID handshake that shields the tracker from
//!   reflection and amplification abuse.
//! - `announce` requests: a peer registers its presence in a swarm and
//!   receives a compact list of other peers in the same swarm.
//! - `scrape` requests: swarm population counters for up to
//!   `max_scrape_responses` torrents per request.
//!
//! The crate is organized in three layers:
//!
//! - [`core`]: the domain layer. The [`Tracker`](core::Tracker) service owns
//!   the swarm table and the usage counters. It knows nothing about sockets.
//! - [`servers`]: the network layer. A fixed pool of blocking worker threads
//!   shares the listen address, decodes datagrams, drives the [`core`] and
//!   encodes replies. A supervisor thread prints a stats line once per minute
//!   and reaps stale peers.
//! - [`config`] and [`bootstrap`]: TOML configuration with environment
//!   overrides, and application assembly (logging, tracker construction).
//!
//! There is no HTTP surface and no persistence: swarm state lives in memory
//! and dies with the process.
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod servers;
pub mod shared;

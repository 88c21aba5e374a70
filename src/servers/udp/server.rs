//! The UDP server: a fixed pool of blocking worker threads plus a
//! supervisor.
//!
//! Every worker owns its own socket, bound to the same local address with
//! `SO_REUSEPORT`, so the kernel spreads inbound datagrams across the pool
//! and each worker transmits on a private queue. Replies therefore always
//! leave from the address clients announced to.
//!
//! Workers block in `recv_from` with a short poll timeout so they can
//! observe the quit flag; there is no async runtime and no cooperative
//! yielding anywhere. The supervisor thread is the caller of
//! [`UdpServer::supervise`]: once per minute it prints the stats line and
//! runs one reaper pass over the swarm table.
use std::io::{self, Cursor};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;

use super::connection_cookie::ConnectionCookie;
use super::handlers;
use super::MAX_PACKET_SIZE;
use crate::config::UdpTracker;
use crate::core::Tracker;

/// How often a blocked worker wakes up to check the quit flag.
const QUIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How often the supervisor prints the stats line and reaps stale peers.
const SUPERVISOR_INTERVAL: Duration = Duration::from_secs(60);

/// A worker gives up after this many receive failures in a row. A transient
/// failure resets the count.
const MAX_CONSECUTIVE_RECV_FAILURES: u32 = 16;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid bind address {addr}: {source}")]
    InvalidBindAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("the udp tracker is ipv4 only, cannot bind to {addr}")]
    NotIpv4 { addr: SocketAddr },

    #[error("unable to set up the server sockets or threads: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// A running UDP tracker server.
pub struct UdpServer {
    tracker: Arc<Tracker>,
    quit: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    bind_address: SocketAddr,
}

impl UdpServer {
    /// Binds the worker sockets and spawns the worker pool.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the bind address does not parse or is not IPv4,
    /// if a socket cannot be bound, or if a thread cannot be spawned.
    pub fn start(tracker: Arc<Tracker>, config: &UdpTracker) -> Result<Self, Error> {
        let requested: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|source| Error::InvalidBindAddress {
                addr: config.bind_address.clone(),
                source,
            })?;
        if !requested.is_ipv4() {
            return Err(Error::NotIpv4 { addr: requested });
        }

        let cookie = Arc::new(ConnectionCookie::new());
        let quit = Arc::new(AtomicBool::new(false));
        let num_threads = std::cmp::max(config.num_threads, 1) as usize;

        // The first bind resolves port 0 to a concrete port; the remaining
        // workers join the same reuseport group.
        let first = bind_worker_socket(requested, config.socket_buffer_size)?;
        let bind_address = first.local_addr()?;

        let mut sockets = vec![first];
        for _ in 1..num_threads {
            sockets.push(bind_worker_socket(bind_address, config.socket_buffer_size)?);
        }

        let workers = sockets
            .into_iter()
            .enumerate()
            .map(|(id, socket)| {
                let tracker = tracker.clone();
                let cookie = cookie.clone();
                let quit = quit.clone();
                thread::Builder::new()
                    .name(format!("udp-worker-{id}"))
                    .spawn(move || worker_loop(&socket, &tracker, &cookie, &quit))
            })
            .collect::<io::Result<Vec<_>>>()?;

        info!("listening on udp://{bind_address} with {num_threads} workers");

        Ok(Self {
            tracker,
            quit,
            workers,
            bind_address,
        })
    }

    /// The resolved local address, useful when the configured port was `0`.
    #[must_use]
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// The flag that stops the server. Register it with the process signal
    /// handlers, or store `true` from anywhere else.
    #[must_use]
    pub fn quit_flag(&self) -> Arc<AtomicBool> {
        self.quit.clone()
    }

    /// Runs the supervisor loop on the calling thread until the quit flag is
    /// raised, then joins the workers.
    ///
    /// Once per minute: sample and print the stats counters, then expire
    /// stale peers in the next batch of swarms.
    pub fn supervise(self) {
        let mut elapsed = Duration::ZERO;

        while !self.quit.load(Ordering::Relaxed) {
            thread::sleep(QUIT_POLL_INTERVAL);
            elapsed += QUIT_POLL_INTERVAL;

            if elapsed >= SUPERVISOR_INTERVAL {
                elapsed = Duration::ZERO;

                info!("{}", self.tracker.stats.sample_and_reset());

                let report = self.tracker.purge_inactive_peers();
                if report.evicted_peers > 0 || report.removed_swarms > 0 {
                    debug!(
                        "reaper: visited {} swarms, evicted {} peers, removed {} swarms",
                        report.visited, report.evicted_peers, report.removed_swarms
                    );
                }
            }
        }

        self.shutdown();
    }

    /// Stops the server: raises the quit flag and joins every worker.
    /// In-flight datagrams are not drained.
    pub fn shutdown(self) {
        self.quit.store(true, Ordering::Relaxed);

        for worker in self.workers {
            let name = worker.thread().name().unwrap_or("udp-worker").to_owned();
            if worker.join().is_err() {
                error!("{name} panicked");
            }
        }

        info!("udp server on {} stopped", self.bind_address);
    }
}

/// Binds one worker socket: `SO_REUSEADDR` + `SO_REUSEPORT` so the pool can
/// share the address, and the configured buffer sizes. Buffer sizing is best
/// effort, a refusal by the kernel is only logged.
fn bind_worker_socket(addr: SocketAddr, buffer_size: usize) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_reuse_address(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true)?;

    if let Err(e) = socket.set_recv_buffer_size(buffer_size) {
        warn!("failed to set socket receive buffer size to {buffer_size}: {e}");
    }
    if let Err(e) = socket.set_send_buffer_size(buffer_size) {
        warn!("failed to set socket send buffer size to {buffer_size}: {e}");
    }

    socket.bind(&addr.into())?;

    let socket: UdpSocket = socket.into();
    socket.set_read_timeout(Some(QUIT_POLL_INTERVAL))?;

    Ok(socket)
}

/// One worker: receive, dispatch, reply, until the quit flag is raised or
/// the socket fails for good.
fn worker_loop(socket: &UdpSocket, tracker: &Tracker, cookie: &ConnectionCookie, quit: &AtomicBool) {
    let mut payload = [0u8; MAX_PACKET_SIZE];
    let mut response_buffer = [0u8; MAX_PACKET_SIZE];
    let mut consecutive_failures: u32 = 0;

    while !quit.load(Ordering::Relaxed) {
        let (len, from) = match socket.recv_from(&mut payload) {
            Ok(received) => {
                consecutive_failures = 0;
                received
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => continue,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("recvfrom failed: {e}");
                consecutive_failures += 1;
                if consecutive_failures >= MAX_CONSECUTIVE_RECV_FAILURES {
                    error!("giving up on the receive socket");
                    break;
                }
                continue;
            }
        };

        tracker.stats.add_bytes_in(len);

        let SocketAddr::V4(from) = from else {
            tracker.stats.increase_errors();
            continue;
        };

        let Some(response) = handlers::handle_packet(&payload[..len], from, tracker, cookie) else {
            continue;
        };

        let mut cursor = Cursor::new(&mut response_buffer[..]);
        if let Err(e) = response.write(&mut cursor) {
            error!("could not encode a response for {from}: {e}");
            continue;
        }
        #[allow(clippy::cast_possible_truncation)]
        let len = cursor.position() as usize;

        send_response(socket, &response_buffer[..len], from, tracker);
    }
}

/// Sends one reply, retrying on `EINTR`. A failed send is logged and the
/// worker moves on; the client will retransmit if it cares.
fn send_response(socket: &UdpSocket, payload: &[u8], to: std::net::SocketAddrV4, tracker: &Tracker) {
    loop {
        match socket.send_to(payload, SocketAddr::V4(to)) {
            Ok(sent) => {
                tracker.stats.add_bytes_out(sent);
                return;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("sendto {to} failed: {e}");
                return;
            }
        }
    }
}

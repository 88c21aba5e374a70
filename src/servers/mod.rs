//! Network servers.
//!
//! There is exactly one: the [`udp`] tracker server.
pub mod udp;

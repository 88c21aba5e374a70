//! The connection cookie: a stateless, reflection-resistant connection id.
//!
//! BEP 15 requires clients to obtain a `connection_id` with a `connect`
//! round-trip before announcing or scraping, which proves they can receive
//! traffic at their claimed source address. Keeping per-client state on the
//! server would open a memory-exhaustion vector, so the id is a cookie the
//! server can recompute instead: the leading 8 bytes of
//! `SHA-1(secret | ip | port)`, where the secret is drawn once at startup.
//!
//! Verification reproduces the digest and compares in constant time. The
//! cookie stays valid for the life of the process; BEP 15's suggested
//! 2-minute validity would require folding a coarse time slice into the
//! hashed input.
use std::net::SocketAddrV4;

use rand::RngCore;
use sha1::{Digest, Sha1};

/// Length of the startup secret the cookies are derived from.
pub const SECRET_BYTES_LEN: usize = 32;

/// Mints and verifies connection cookies for client endpoints.
pub struct ConnectionCookie {
    secret: [u8; SECRET_BYTES_LEN],
}

impl Default for ConnectionCookie {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionCookie {
    /// Creates an issuer with a fresh random secret.
    #[must_use]
    pub fn new() -> Self {
        let mut secret = [0u8; SECRET_BYTES_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        Self { secret }
    }

    /// Creates an issuer with a caller-provided secret.
    #[must_use]
    pub fn with_secret(secret: [u8; SECRET_BYTES_LEN]) -> Self {
        Self { secret }
    }

    /// Mints the cookie for a client endpoint.
    #[must_use]
    pub fn mint(&self, remote_addr: &SocketAddrV4) -> u64 {
        u64::from_be_bytes(self.digest(remote_addr))
    }

    /// Checks that `cookie` was minted for `remote_addr`, in constant time.
    #[must_use]
    pub fn verify(&self, cookie: u64, remote_addr: &SocketAddrV4) -> bool {
        let expected = self.digest(remote_addr);
        let got = cookie.to_be_bytes();

        got.iter().zip(expected.iter()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }

    fn digest(&self, remote_addr: &SocketAddrV4) -> [u8; 8] {
        let mut hasher = Sha1::new();
        hasher.update(self.secret);
        hasher.update(remote_addr.ip().octets());
        hasher.update(remote_addr.port().to_be_bytes());

        let digest = hasher.finalize();
        let mut cookie = [0u8; 8];
        cookie.copy_from_slice(&digest[..8]);
        cookie
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddrV4};

    use super::{ConnectionCookie, SECRET_BYTES_LEN};

    fn remote_addr() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::new(126, 0, 0, 1), 8080)
    }

    #[test]
    fn a_minted_cookie_should_verify_for_the_same_endpoint() {
        let issuer = ConnectionCookie::new();

        let cookie = issuer.mint(&remote_addr());

        assert!(issuer.verify(cookie, &remote_addr()));
    }

    #[test]
    fn minting_should_be_deterministic_for_the_same_endpoint() {
        let issuer = ConnectionCookie::new();

        assert_eq!(issuer.mint(&remote_addr()), issuer.mint(&remote_addr()));
    }

    #[test]
    fn a_cookie_should_not_verify_for_a_different_ip() {
        let issuer = ConnectionCookie::new();

        let cookie = issuer.mint(&remote_addr());

        assert!(!issuer.verify(cookie, &SocketAddrV4::new(Ipv4Addr::new(126, 0, 0, 2), 8080)));
    }

    #[test]
    fn a_cookie_should_not_verify_for_a_different_port() {
        let issuer = ConnectionCookie::new();

        let cookie = issuer.mint(&remote_addr());

        assert!(!issuer.verify(cookie, &SocketAddrV4::new(*remote_addr().ip(), 8081)));
    }

    #[test]
    fn different_secrets_should_mint_different_cookies() {
        let first = ConnectionCookie::with_secret([1u8; SECRET_BYTES_LEN]);
        let second = ConnectionCookie::with_secret([2u8; SECRET_BYTES_LEN]);

        assert_ne!(first.mint(&remote_addr()), second.mint(&remote_addr()));
    }
}

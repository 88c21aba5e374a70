//! Time handling for the tracker.
//!
//! Peer freshness is tracked as a [`Duration`] since the Unix epoch rather
//! than an [`std::time::Instant`] so that tests can fabricate arbitrary
//! timestamps.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Duration since the Unix epoch.
pub type DurationSinceUnixEpoch = Duration;

/// The current time.
#[must_use]
pub fn now() -> DurationSinceUnixEpoch {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

/// The current time minus `secs`, saturating at the epoch.
#[must_use]
pub fn now_sub_secs(secs: u64) -> DurationSinceUnixEpoch {
    now().saturating_sub(Duration::from_secs(secs))
}

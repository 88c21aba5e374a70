//! Tracker usage counters.
//!
//! Workers bump these from the hot path, so they are plain atomics rather
//! than a locked struct. The supervisor samples and zeroes all six once per
//! minute and prints the sample as a single stats line.
use std::sync::atomic::{AtomicU32, Ordering};

/// Global tracker counters, updated with relaxed read-modify-write ops.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Number of `connect` requests handled.
    pub connects: AtomicU32,
    /// Number of `announce` requests handled.
    pub announces: AtomicU32,
    /// Number of `scrape` requests handled.
    pub scrapes: AtomicU32,
    /// Number of dropped datagrams: malformed, bad cookie or unknown action.
    pub errors: AtomicU32,
    /// Payload bytes received.
    pub bytes_in: AtomicU32,
    /// Payload bytes sent.
    pub bytes_out: AtomicU32,
}

/// One minute's worth of [`Metrics`], as sampled by the supervisor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSample {
    pub connects: u32,
    pub announces: u32,
    pub scrapes: u32,
    pub errors: u32,
    pub bytes_in: u32,
    pub bytes_out: u32,
}

impl Metrics {
    pub fn increase_connects(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increase_announces(&self) {
        self.announces.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increase_scrapes(&self) {
        self.scrapes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increase_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes_in(&self, n: usize) {
        #[allow(clippy::cast_possible_truncation)]
        self.bytes_in.fetch_add(n as u32, Ordering::Relaxed);
    }

    pub fn add_bytes_out(&self, n: usize) {
        #[allow(clippy::cast_possible_truncation)]
        self.bytes_out.fetch_add(n as u32, Ordering::Relaxed);
    }

    /// Takes the current values and resets all counters to zero.
    pub fn sample_and_reset(&self) -> MetricsSample {
        MetricsSample {
            connects: self.connects.swap(0, Ordering::Relaxed),
            announces: self.announces.swap(0, Ordering::Relaxed),
            scrapes: self.scrapes.swap(0, Ordering::Relaxed),
            errors: self.errors.swap(0, Ordering::Relaxed),
            bytes_in: self.bytes_in.swap(0, Ordering::Relaxed),
            bytes_out: self.bytes_out.swap(0, Ordering::Relaxed),
        }
    }

    /// Reads the current values without resetting them.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSample {
        MetricsSample {
            connects: self.connects.load(Ordering::Relaxed),
            announces: self.announces.load(Ordering::Relaxed),
            scrapes: self.scrapes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Display for MetricsSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "c: {} a: {} s: {} e: {} in: {} kB out: {} kB",
            self.connects,
            self.announces,
            self.scrapes,
            self.errors,
            self.bytes_in / 1000,
            self.bytes_out / 1000
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Metrics;

    #[test]
    fn sampling_should_reset_the_counters() {
        let metrics = Metrics::default();
        metrics.increase_connects();
        metrics.increase_announces();
        metrics.increase_announces();
        metrics.add_bytes_in(100);

        let sample = metrics.sample_and_reset();

        assert_eq!(sample.connects, 1);
        assert_eq!(sample.announces, 2);
        assert_eq!(sample.bytes_in, 100);
        assert_eq!(metrics.snapshot(), super::MetricsSample::default());
    }

    #[test]
    fn the_stats_line_should_report_bytes_in_kilobytes() {
        let metrics = Metrics::default();
        metrics.add_bytes_in(2500);
        metrics.add_bytes_out(999);

        let line = metrics.sample_and_reset().to_string();

        assert_eq!(line, "c: 0 a: 0 s: 0 e: 0 in: 2 kB out: 0 kB");
    }
}

//! Configuration data structures and loading.
//!
//! The tracker is configured with a TOML file. Every field has a default, so
//! an empty (or missing) file yields a working public tracker on UDP port
//! 8080. Two environment variables override the file:
//!
//! - `UDP_TRACKER_CONFIG_TOML`: the whole TOML content, inline. Takes
//!   priority over the file.
//! - `UDP_TRACKER_CONFIG_TOML_PATH`: the file location.
//!
//! The default configuration:
//!
//! ```toml
//! log_level = "info"
//!
//! [udp_tracker]
//! bind_address = "0.0.0.0:8080"
//! num_threads = 4
//! socket_buffer_size = 5242880
//! allow_alternate_ip = false
//!
//! [policy]
//! announce_interval = 1800
//! peer_ttl = 3600
//! max_scrape_responses = 74
//! max_peers_per_announce_reply = 200
//! ```
use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The whole TOML content. It has priority over the config file.
pub const ENV_VAR_CONFIG_TOML: &str = "UDP_TRACKER_CONFIG_TOML";

/// The config file location.
pub const ENV_VAR_CONFIG_TOML_PATH: &str = "UDP_TRACKER_CONFIG_TOML_PATH";

/// The default config file location.
pub const DEFAULT_CONFIG_TOML_PATH: &str = "./tracker.toml";

#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to read config file {path}: {source}")]
    UnreadableFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {source}")]
    Invalid {
        #[from]
        source: toml::de::Error,
    },
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    #[must_use]
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// The UDP server section.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct UdpTracker {
    /// The address the tracker binds to, `ip:port`. Port `0` lets the
    /// operating system pick a free port.
    #[serde(default = "UdpTracker::default_bind_address")]
    pub bind_address: String,

    /// Number of worker threads serving requests.
    #[serde(default = "UdpTracker::default_num_threads")]
    pub num_threads: u32,

    /// Requested `SO_RCVBUF`/`SO_SNDBUF` size in bytes.
    #[serde(default = "UdpTracker::default_socket_buffer_size")]
    pub socket_buffer_size: usize,

    /// Honor the announce's `ip` field when non-zero instead of the
    /// datagram's source address. Off by default since it allows spoofing.
    #[serde(default = "UdpTracker::default_allow_alternate_ip")]
    pub allow_alternate_ip: bool,
}

impl Default for UdpTracker {
    fn default() -> Self {
        Self {
            bind_address: Self::default_bind_address(),
            num_threads: Self::default_num_threads(),
            socket_buffer_size: Self::default_socket_buffer_size(),
            allow_alternate_ip: Self::default_allow_alternate_ip(),
        }
    }
}

impl UdpTracker {
    fn default_bind_address() -> String {
        "0.0.0.0:8080".to_string()
    }

    fn default_num_threads() -> u32 {
        4
    }

    fn default_socket_buffer_size() -> usize {
        5 * 1024 * 1024
    }

    fn default_allow_alternate_ip() -> bool {
        false
    }
}

/// Swarm bookkeeping policy.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct TrackerPolicy {
    /// Base announce interval in seconds returned to clients. The actual
    /// reply carries a uniform value in `[base - 120, base + 120]` to spread
    /// re-announces.
    #[serde(default = "TrackerPolicy::default_announce_interval")]
    pub announce_interval: u32,

    /// Maximum time in seconds a peer can stay silent before the reaper
    /// evicts it. Twice the announce interval by default.
    #[serde(default = "TrackerPolicy::default_peer_ttl")]
    pub peer_ttl: u32,

    /// Hard cap on the number of torrents answered in one scrape reply.
    /// Longer requests are truncated, not rejected.
    #[serde(default = "TrackerPolicy::default_max_scrape_responses")]
    pub max_scrape_responses: usize,

    /// Hard cap on the number of peers in one announce reply.
    #[serde(default = "TrackerPolicy::default_max_peers_per_announce_reply")]
    pub max_peers_per_announce_reply: usize,
}

impl Default for TrackerPolicy {
    fn default() -> Self {
        Self {
            announce_interval: Self::default_announce_interval(),
            peer_ttl: Self::default_peer_ttl(),
            max_scrape_responses: Self::default_max_scrape_responses(),
            max_peers_per_announce_reply: Self::default_max_peers_per_announce_reply(),
        }
    }
}

impl TrackerPolicy {
    fn default_announce_interval() -> u32 {
        1800
    }

    fn default_peer_ttl() -> u32 {
        2 * Self::default_announce_interval()
    }

    fn default_max_scrape_responses() -> usize {
        74
    }

    fn default_max_peers_per_announce_reply() -> usize {
        200
    }
}

/// The whole tracker configuration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct Configuration {
    /// Logging threshold. `None` means `info`.
    #[serde(default)]
    pub log_level: Option<LogLevel>,

    #[serde(default)]
    pub udp_tracker: UdpTracker,

    #[serde(default)]
    pub policy: TrackerPolicy,
}

impl Configuration {
    /// Parses a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the TOML is syntactically invalid or contains
    /// values of the wrong type.
    pub fn load_from_str(toml: &str) -> Result<Self, Error> {
        Ok(toml::from_str(toml)?)
    }

    /// Loads the configuration from the environment override or the config
    /// file. A missing file yields the defaults; an unreadable or invalid
    /// one is an error.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an explicitly named config file cannot be read,
    /// or if the TOML (from either source) does not parse.
    pub fn load_from_env_or_file() -> Result<Self, Error> {
        if let Ok(toml) = env::var(ENV_VAR_CONFIG_TOML) {
            return Self::load_from_str(&toml);
        }

        match env::var(ENV_VAR_CONFIG_TOML_PATH) {
            Ok(path) => match std::fs::read_to_string(&path) {
                Ok(toml) => Self::load_from_str(&toml),
                Err(source) => Err(Error::UnreadableFile { path, source }),
            },
            Err(_) => match std::fs::read_to_string(DEFAULT_CONFIG_TOML_PATH) {
                Ok(toml) => Self::load_from_str(&toml),
                Err(_) => Ok(Self::default()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Configuration;

    #[test]
    fn an_empty_toml_should_yield_the_default_configuration() {
        let configuration = Configuration::load_from_str("").unwrap();

        assert_eq!(configuration, Configuration::default());
        assert_eq!(configuration.udp_tracker.bind_address, "0.0.0.0:8080");
        assert_eq!(configuration.udp_tracker.num_threads, 4);
        assert_eq!(configuration.policy.announce_interval, 1800);
        assert_eq!(configuration.policy.peer_ttl, 3600);
        assert_eq!(configuration.policy.max_scrape_responses, 74);
        assert_eq!(configuration.policy.max_peers_per_announce_reply, 200);
    }

    #[test]
    fn it_should_load_partial_overrides() {
        let toml = r#"
            log_level = "debug"

            [udp_tracker]
            bind_address = "127.0.0.1:6969"

            [policy]
            announce_interval = 900
        "#;

        let configuration = Configuration::load_from_str(toml).unwrap();

        assert_eq!(configuration.udp_tracker.bind_address, "127.0.0.1:6969");
        assert_eq!(configuration.udp_tracker.num_threads, 4);
        assert_eq!(configuration.policy.announce_interval, 900);
    }

    #[test]
    fn log_levels_should_map_onto_the_log_crate_filters() {
        let configuration = Configuration::load_from_str("log_level = \"warn\"").unwrap();

        assert_eq!(
            configuration.log_level.unwrap().to_level_filter(),
            log::LevelFilter::Warn
        );
    }

    #[test]
    fn it_should_reject_invalid_toml() {
        assert!(Configuration::load_from_str("[udp_tracker").is_err());
    }

    #[test]
    fn it_should_reject_values_of_the_wrong_type() {
        assert!(Configuration::load_from_str("[policy]\nannounce_interval = \"soon\"").is_err());
    }
}

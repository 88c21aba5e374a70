//! The event attached to an `announce` request.
use serde::{Deserialize, Serialize};

/// Announce events. See the `event` field in
/// [BEP 15](https://www.bittorrent.org/beps/bep_0015.html).
#[derive(Serialize, Deserialize, Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AnnounceEvent {
    /// Regular periodic announce.
    #[default]
    None,
    /// The peer has just completed the download.
    Completed,
    /// The peer has just joined the swarm.
    Started,
    /// The peer is leaving the swarm.
    Stopped,
}

impl AnnounceEvent {
    /// Decodes the wire value. Unknown values fall back to [`Self::None`],
    /// matching the permissiveness of deployed trackers.
    #[must_use]
    pub fn from_u32(i: u32) -> Self {
        match i {
            1 => Self::Completed,
            2 => Self::Started,
            3 => Self::Stopped,
            _ => Self::None,
        }
    }

    #[must_use]
    pub fn to_u32(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Completed => 1,
            Self::Started => 2,
            Self::Stopped => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AnnounceEvent;

    #[test]
    fn it_should_map_wire_values_both_ways() {
        for event in [
            AnnounceEvent::None,
            AnnounceEvent::Completed,
            AnnounceEvent::Started,
            AnnounceEvent::Stopped,
        ] {
            assert_eq!(AnnounceEvent::from_u32(event.to_u32()), event);
        }
    }

    #[test]
    fn it_should_treat_unknown_wire_values_as_a_plain_announce() {
        assert_eq!(AnnounceEvent::from_u32(42), AnnounceEvent::None);
    }
}

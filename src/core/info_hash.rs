//! A `BitTorrent` info-hash. It is the unique identifier of a torrent and
//! therefore the key of the swarm table.
//!
//! "The 20-byte sha1 hash of the bencoded form of the info value from the
//! metainfo file." See [BEP 3](https://www.bittorrent.org/beps/bep_0003.html).
//!
//! Only Info Hash v1 is supported. The tracker never computes info-hashes,
//! it only compares them bitwise; the hex representation exists for logging
//! and configuration.
use std::panic::Location;

use thiserror::Error;

/// Number of bytes of an Info Hash v1.
pub const INFO_HASH_BYTES_LEN: usize = 20;

/// `BitTorrent` Info Hash v1.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy, Default)]
pub struct InfoHash(pub [u8; INFO_HASH_BYTES_LEN]);

impl InfoHash {
    /// Returns the internal byte array.
    #[must_use]
    pub fn bytes(&self) -> [u8; INFO_HASH_BYTES_LEN] {
        self.0
    }
}

impl std::fmt::Display for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chars = [0u8; INFO_HASH_BYTES_LEN * 2];
        binascii::bin2hex(&self.0, &mut chars).expect("it should fit in the output buffer");
        write!(f, "{}", std::str::from_utf8(&chars).expect("hex digits are valid utf8"))
    }
}

impl std::fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InfoHash({self})")
    }
}

impl std::str::FromStr for InfoHash {
    type Err = binascii::ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != INFO_HASH_BYTES_LEN * 2 {
            return Err(binascii::ConvertError::InvalidInputLength);
        }
        let mut i = Self::default();
        binascii::hex2bin(s.as_bytes(), &mut i.0)?;
        Ok(i)
    }
}

impl From<[u8; INFO_HASH_BYTES_LEN]> for InfoHash {
    fn from(bytes: [u8; INFO_HASH_BYTES_LEN]) -> Self {
        Self(bytes)
    }
}

/// Errors returned when converting a byte slice of the wrong length.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("not enough bytes for infohash: {message} {location}")]
    NotEnoughBytes {
        location: &'static Location<'static>,
        message: String,
    },
    #[error("too many bytes for infohash: {message} {location}")]
    TooManyBytes {
        location: &'static Location<'static>,
        message: String,
    },
}

impl TryFrom<&[u8]> for InfoHash {
    type Error = ConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < INFO_HASH_BYTES_LEN {
            return Err(ConversionError::NotEnoughBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), INFO_HASH_BYTES_LEN},
            });
        }
        if bytes.len() > INFO_HASH_BYTES_LEN {
            return Err(ConversionError::TooManyBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), INFO_HASH_BYTES_LEN},
            });
        }
        let mut hash = Self::default();
        hash.0.copy_from_slice(bytes);
        Ok(hash)
    }
}

impl serde::ser::Serialize for InfoHash {
    fn serialize<S: serde::ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::de::Deserialize<'de> for InfoHash {
    fn deserialize<D: serde::de::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
        des.deserialize_str(InfoHashVisitor)
    }
}

struct InfoHashVisitor;

impl serde::de::Visitor<'_> for InfoHashVisitor {
    type Value = InfoHash;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "a 40 character long hash")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(|_| {
            serde::de::Error::invalid_value(serde::de::Unexpected::Str(v), &"a 40 character long hexadecimal string")
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::InfoHash;

    #[test]
    fn it_should_display_as_lowercase_hex() {
        let hash = InfoHash([0x11; 20]);

        assert_eq!(hash.to_string(), "1111111111111111111111111111111111111111");
    }

    #[test]
    fn it_should_round_trip_through_the_hex_representation() {
        let hash = InfoHash(*b"\x00\x01\x02\x03\x04\x05\x06\x07\x08\x09\x0a\x0b\x0c\x0d\x0e\x0f\x10\x11\x12\x13");

        assert_eq!(InfoHash::from_str(&hash.to_string()).unwrap(), hash);
    }

    #[test]
    fn it_should_reject_a_hex_string_of_the_wrong_length() {
        assert!(InfoHash::from_str("deadbeef").is_err());
    }

    #[test]
    fn it_should_be_converted_from_a_20_byte_slice() {
        let bytes = [7u8; 20];

        assert_eq!(InfoHash::try_from(&bytes[..]).unwrap(), InfoHash(bytes));
        assert!(InfoHash::try_from(&bytes[..19]).is_err());
    }
}

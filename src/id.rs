//! Message and event identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexErrorKind};

/// Identity of a message: the local id in the high half, the source id in the low half.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MessageId(u64);

impl MessageId {
    /// The all-zero id. Never valid.
    pub const ZERO: MessageId = MessageId(0);
    /// Marker for "no such message". Never valid.
    pub const NONEXISTENT: MessageId = MessageId(u64::MAX);

    /// Wrap a raw 64-bit id.
    pub const fn new(data: u64) -> Self {
        MessageId(data)
    }

    /// Compose an id out of a source-local id and the source id.
    pub const fn from_parts(local_id: u32, src_id: u32) -> Self {
        MessageId(((local_id as u64) << 32) | src_id as u64)
    }

    /// The raw value.
    pub const fn data(self) -> u64 {
        self.0
    }

    /// The id of the source the message came from.
    pub const fn src_id(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    /// Whether the id can identify an indexed message.
    pub const fn is_valid(self) -> bool {
        self.0 != Self::ZERO.0 && self.0 != Self::NONEXISTENT.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 16 {
            return Err(IndexErrorKind::InvalidMessageIdFormat(s.to_string()).into());
        }
        u64::from_str_radix(s, 16)
            .map(MessageId)
            .map_err(|_| IndexErrorKind::InvalidMessageIdFormat(s.to_string()).into())
    }
}

/// Identity of a group of messages describing the same event.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EventId(pub u64);

impl EventId {
    /// Whether this is the null event, i.e. no grouping.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_and_validity() {
        let id = MessageId::from_parts(7, 42);
        assert_eq!(id.src_id(), 42);
        assert_eq!(id.data() >> 32, 7);
        assert!(id.is_valid());
        assert!(!MessageId::ZERO.is_valid());
        assert!(!MessageId::NONEXISTENT.is_valid());
    }

    #[test]
    fn test_hex_string_form() {
        let id = MessageId::new(0xAB_CDEF);
        assert_eq!(id.to_string(), "0000000000ABCDEF");
        assert_eq!("abcdef".parse::<MessageId>().ok(), Some(id));
        assert!("".parse::<MessageId>().is_err());
        assert!("0123456789ABCDEF0".parse::<MessageId>().is_err());
        assert!("xyz".parse::<MessageId>().is_err());
    }
}

//! Length-prefixed frames exchanged with the network peer.
//!
//! A frame is one length byte followed by a type byte and the payload. The
//! length counts the type byte, so a frame carries at most 254 payload bytes
//! and the smallest valid length is 1.

pub mod codec;

pub use codec::{read_packet, write_packet};

/// Largest frame body (type byte plus payload) a length byte can describe
pub const MAX_BODY_LEN: usize = u8::MAX as usize;

/// Largest payload that fits in a single frame
pub const MAX_PAYLOAD_LEN: usize = MAX_BODY_LEN - 1;

/// Frame type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Raw serial bytes
    Data,
    /// Modem signal mask
    Flow,
    /// Any other tag; consumed and dropped by the bridge
    Unknown(u8),
}

impl PacketType {
    pub const DATA: u8 = 0x01;
    pub const FLOW: u8 = 0x02;

    pub fn as_byte(self) -> u8 {
        match self {
            PacketType::Data => Self::DATA,
            PacketType::Flow => Self::FLOW,
            PacketType::Unknown(tag) => tag,
        }
    }
}

impl From<u8> for PacketType {
    fn from(tag: u8) -> Self {
        match tag {
            Self::DATA => PacketType::Data,
            Self::FLOW => PacketType::Flow,
            other => PacketType::Unknown(other),
        }
    }
}

impl std::fmt::Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketType::Data => write!(f, "data"),
            PacketType::Flow => write!(f, "flow"),
            PacketType::Unknown(tag) => write!(f, "unknown(0x{:02x})", tag),
        }
    }
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_type: PacketType,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(packet_type: PacketType, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            packet_type,
            payload: payload.into(),
        }
    }

    pub fn data(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(PacketType::Data, payload)
    }

    pub fn flow(mask: u8) -> Self {
        Self::new(PacketType::Flow, vec![mask])
    }

    /// Value of the length byte that prefixes this packet on the wire
    pub fn body_len(&self) -> usize {
        1 + self.payload.len()
    }
}

//! Packet framing
//!
//! Every datagram is one text frame:
//!
//! ```text
//! <kind>|<sequence number>|<payload>|<checksum>
//! ```
//!
//! The checksum is the decimal CRC-32 of everything up to and including the
//! last `|`. Payloads may contain `|` themselves; the decoder takes the first
//! two fields and the last one and keeps whatever sits between as payload.

use std::fmt;
use std::str::FromStr;

use crate::error::PacketError;
use crate::types::{SequenceNumber, FIXED_SEQUENCE};

const SEPARATOR: char = '|';

/// Packet kind tag
///
/// Only `Data` carries application meaning; the others are accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Data,
    Start,
    End,
    Ack,
}

impl PacketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PacketKind::Data => "data",
            PacketKind::Start => "start",
            PacketKind::End => "end",
            PacketKind::Ack => "ack",
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PacketKind {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(PacketKind::Data),
            "start" => Ok(PacketKind::Start),
            "end" => Ok(PacketKind::End),
            "ack" => Ok(PacketKind::Ack),
            other => Err(PacketError::UnknownKind(other.to_string())),
        }
    }
}

/// One transport frame, minus its checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketKind,
    pub sequence: SequenceNumber,
    pub payload: String,
}

/// Result of parsing a frame
///
/// Callers must check `checksum_valid` before trusting `packet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    pub packet: Packet,
    /// Checksum as transmitted
    pub checksum: u32,
    /// Whether the transmitted checksum matches the recomputed one
    pub checksum_valid: bool,
}

impl Packet {
    pub fn new(kind: PacketKind, sequence: SequenceNumber, payload: impl Into<String>) -> Self {
        Self {
            kind,
            sequence,
            payload: payload.into(),
        }
    }

    /// DATA packet with the fixed sequence number
    pub fn data(payload: impl Into<String>) -> Self {
        Self::new(PacketKind::Data, FIXED_SEQUENCE, payload)
    }

    /// Serialize to the on-wire frame
    pub fn encode(&self) -> Vec<u8> {
        let body = format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}",
            self.kind, self.sequence, self.payload
        );
        let checksum = checksum(body.as_bytes());
        let mut frame = body.into_bytes();
        frame.extend_from_slice(checksum.to_string().as_bytes());
        frame
    }

    /// Parse an on-wire frame
    ///
    /// Structural faults yield `PacketError`; a checksum mismatch does not.
    pub fn decode(bytes: &[u8]) -> Result<DecodedPacket, PacketError> {
        let text =
            std::str::from_utf8(bytes).map_err(|_| PacketError::Malformed("not valid UTF-8"))?;

        let body_len = text
            .rfind(SEPARATOR)
            .ok_or(PacketError::Malformed("no field separator"))?
            + SEPARATOR.len_utf8();
        let (body, checksum_field) = text.split_at(body_len);

        let mut fields = body[..body_len - SEPARATOR.len_utf8()].splitn(3, SEPARATOR);
        let kind_field = fields.next().ok_or(PacketError::Malformed("missing kind"))?;
        let sequence_field = fields
            .next()
            .ok_or(PacketError::Malformed("missing sequence number"))?;
        let payload = fields
            .next()
            .ok_or(PacketError::Malformed("missing payload"))?;

        let sequence = sequence_field
            .parse::<SequenceNumber>()
            .map_err(|_| PacketError::Malformed("sequence number is not an integer"))?;
        let transmitted = checksum_field
            .parse::<u32>()
            .map_err(|_| PacketError::Malformed("checksum is not an integer"))?;
        let checksum_valid = checksum(body.as_bytes()) == transmitted;

        // An unrecognized kind only counts as such on an intact frame
        let kind = match kind_field.parse::<PacketKind>() {
            Ok(kind) => kind,
            Err(_) if !checksum_valid => {
                return Err(PacketError::Malformed("corrupt frame"));
            }
            Err(e) => return Err(e),
        };

        Ok(DecodedPacket {
            packet: Packet::new(kind, sequence, payload),
            checksum: transmitted,
            checksum_valid,
        })
    }
}

/// CRC-32 (IEEE) over a frame body
pub fn checksum(body: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(body);
    hasher.finalize()
}

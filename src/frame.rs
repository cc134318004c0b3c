//! Framed-packet layer: 8-byte header, payload, additive checksum.
//!
//! Every byte sequence written to the device travels inside one of these
//! frames. The header carries the packet-type code, the total packet count of
//! the transmission (constant across all its chunks) and a countdown of the
//! packets remaining after this one. The trailing checksum byte makes the sum
//! of the whole frame a multiple of 256.

use crate::error::Error;

/// First byte of every frame.
pub const COMMAND_TYPE: u8 = 0xF1;

/// Header bytes preceding the payload.
pub const HEADER_LEN: usize = 8;

/// Smallest well-formed frame: header plus checksum around an empty payload.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + 1;

/// Packet-type codes carried in byte 1 of the header and in the `"type"`
/// field of the JSON envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Animation container body.
    DynamicAmbience,
    /// Single-image body and all info announcements.
    Image,
    /// Reserved by the device firmware; never emitted by this crate.
    PhotoAlbumCount,
    /// Inbound device-state notification.
    DeviceStatus,
}

impl PacketType {
    pub const fn code(self) -> u8 {
        match self {
            PacketType::DynamicAmbience => 0x05,
            PacketType::Image => 0x06,
            PacketType::PhotoAlbumCount => 0x0C,
            PacketType::DeviceStatus => 0x0D,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x05 => Some(PacketType::DynamicAmbience),
            0x06 => Some(PacketType::Image),
            0x0C => Some(PacketType::PhotoAlbumCount),
            0x0D => Some(PacketType::DeviceStatus),
            _ => None,
        }
    }
}

/// A verified frame, borrowing its payload from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFrame<'a> {
    pub subtype: PacketType,
    pub total: u16,
    pub remaining: u16,
    pub payload: &'a [u8],
}

/// Checksum byte that brings `bytes` to a sum of zero modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum: u32 = bytes.iter().map(|&b| u32::from(b)).sum();
    ((256 - (sum % 256)) % 256) as u8
}

/// Build one frame around `payload`.
///
/// `total` and `remaining` are 16-bit on the wire; wider values truncate
/// modulo 65536, matching the device. Callers that split large payloads must
/// honor the same width.
pub fn build(subtype: PacketType, total: u32, remaining: u32, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= u16::MAX as usize);

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + 1);
    frame.push(COMMAND_TYPE);
    frame.push(subtype.code());
    frame.extend_from_slice(&(total as u16).to_be_bytes());
    frame.extend_from_slice(&(remaining as u16).to_be_bytes());
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(payload);
    frame.push(checksum(&frame));
    frame
}

/// Validate `frame` and decompose it into its header fields and payload.
pub fn verify(frame: &[u8]) -> Result<ParsedFrame<'_>, Error> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(Error::ProtocolViolation("frame shorter than header"));
    }
    if frame[0] != COMMAND_TYPE {
        return Err(Error::ProtocolViolation("unknown command type"));
    }
    let subtype = PacketType::from_code(frame[1])
        .ok_or(Error::ProtocolViolation("unknown packet type"))?;

    let total = u16::from_be_bytes([frame[2], frame[3]]);
    let remaining = u16::from_be_bytes([frame[4], frame[5]]);
    let payload_len = u16::from_be_bytes([frame[6], frame[7]]) as usize;
    if frame.len() != HEADER_LEN + payload_len + 1 {
        return Err(Error::ProtocolViolation("payload length field mismatch"));
    }

    let sum: u32 = frame.iter().map(|&b| u32::from(b)).sum();
    if sum % 256 != 0 {
        return Err(Error::ProtocolViolation("checksum mismatch"));
    }

    Ok(ParsedFrame {
        subtype,
        total,
        remaining,
        payload: &frame[HEADER_LEN..HEADER_LEN + payload_len],
    })
}

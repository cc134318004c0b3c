//! Envelopes the device expects around image and animation bodies.
//!
//! The data envelope looks like JSON but is not: the `data` value is the raw
//! binary container, unescaped and unencoded. Prefix and suffix are emitted
//! as literal byte sequences; running a JSON serializer over the combined
//! structure would corrupt the transmission.

use crate::error::Error;
use crate::frame::PacketType;
use crate::imb;
use crate::xv4;

/// The announcement payload preceding a transfer, e.g. `{"type":6,"number":1}`.
///
/// Compact ASCII, fixed key order, no whitespace. Animations announce with
/// the IMAGE code too.
pub fn image_info(subtype: PacketType, count: u32) -> Vec<u8> {
    format!("{{\"type\":{},\"number\":{}}}", subtype.code(), count).into_bytes()
}

/// A single-image data payload: JSON-like prefix, IMB header, raw JPEG, `}`.
pub fn image_data(jpeg: &[u8], size: (u16, u16), subtype: PacketType) -> Vec<u8> {
    let header = imb::build(jpeg.len() as u32, size.0, size.1);
    let prefix = envelope_prefix(subtype);

    let mut out = Vec::with_capacity(prefix.len() + header.len() + jpeg.len() + 1);
    out.extend_from_slice(prefix.as_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(jpeg);
    out.push(b'}');
    out
}

/// An animation data payload: the same envelope around an xV4 container.
pub fn animation_data(
    frames: &[xv4::Frame],
    interval_ms: u32,
    size: (u16, u16),
) -> Result<Vec<u8>, Error> {
    let container = xv4::build(frames, interval_ms, size)?;
    let prefix = envelope_prefix(PacketType::DynamicAmbience);

    let mut out = Vec::with_capacity(prefix.len() + container.len() + 1);
    out.extend_from_slice(prefix.as_bytes());
    out.extend_from_slice(&container);
    out.push(b'}');
    Ok(out)
}

fn envelope_prefix(subtype: PacketType) -> String {
    format!("{{\"type\":{},\"data\":", subtype.code())
}

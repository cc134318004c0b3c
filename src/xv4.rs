//! xV4 container: the animation format.
//!
//! Layout: a 32-byte fixed header, a 16-byte-per-frame table, then one
//! region per frame holding a 32-byte metadata block followed by the raw
//! JPEG. Each metadata block points at the *next* frame's metadata and the
//! last frame points back at the first, so the device walks the frames as a
//! cyclic linked list. A terminating null pointer would stop playback after
//! one pass; the wrap-around is load-bearing.
//!
//! All offsets are computed in a single forward pass before any bytes are
//! emitted, so no back-patching is needed.

use crate::error::Error;

/// Fixed header bytes.
pub const HEADER_LEN: usize = 32;

/// Frame-table entry bytes.
pub const TABLE_ENTRY_LEN: usize = 16;

/// Per-frame metadata block bytes.
pub const FRAME_META_LEN: usize = 32;

/// Width of the name slot in a table entry, trailing dot included.
pub const NAME_LEN: usize = 12;

const SIGNATURE: &[u8; 3] = b"xV4";
const VERSION: u8 = 0x12;

/// Inclusive bounds of the inter-frame interval. The timing slot in the
/// header is a fixed 12-byte `"output/NNms"` string, so only two-digit
/// values survive formatting.
pub const MIN_INTERVAL_MS: u32 = 50;
pub const MAX_INTERVAL_MS: u32 = 99;

/// One animation frame: a name for the table slot and its JPEG body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub name: String,
    pub jpeg: Vec<u8>,
}

impl Frame {
    pub fn new(name: impl Into<String>, jpeg: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            jpeg,
        }
    }
}

/// Canonical name for the frame at 1-based `index`.
pub fn frame_name(index: usize) -> String {
    format!("frame_{:05}", index)
}

/// Clamp a requested interval into the representable range.
pub fn clamp_interval(interval_ms: u32) -> u32 {
    interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
}

/// Build the container for `frames` played at `interval_ms` per frame.
pub fn build(
    frames: &[Frame],
    interval_ms: u32,
    (width, height): (u16, u16),
) -> Result<Vec<u8>, Error> {
    if frames.is_empty() {
        return Err(Error::EmptyAnimation);
    }
    let count = frames.len();
    let table_end = HEADER_LEN + TABLE_ENTRY_LEN * count;

    // Metadata offsets for every frame, one forward pass.
    let mut meta_offsets = Vec::with_capacity(count);
    let mut offset = table_end;
    for frame in frames {
        meta_offsets.push(offset as u32);
        offset += FRAME_META_LEN + frame.jpeg.len();
    }
    let data_region: usize = frames
        .iter()
        .map(|f| FRAME_META_LEN + f.jpeg.len())
        .sum();

    let mut out = Vec::with_capacity(offset);

    out.extend_from_slice(SIGNATURE);
    out.push(VERSION);
    out.extend_from_slice(&((table_end - 8) as u32).to_le_bytes());
    out.extend_from_slice(&(count as u32).to_le_bytes());
    out.extend_from_slice(&((count * 10 + 10) as u32).to_le_bytes());
    out.extend_from_slice(&timing_slot(interval_ms));
    out.extend_from_slice(&(data_region as u32).to_le_bytes());

    for (frame, &meta) in frames.iter().zip(&meta_offsets) {
        out.extend_from_slice(&name_slot(&frame.name));
        out.extend_from_slice(&meta.to_le_bytes());
    }

    for (i, frame) in frames.iter().enumerate() {
        let meta = meta_offsets[i];
        let next = meta_offsets[(i + 1) % count];
        out.extend_from_slice(&meta.to_le_bytes());
        out.extend_from_slice(&next.to_le_bytes());
        out.extend_from_slice(&(count.saturating_sub(3) as u32).to_le_bytes());
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&(meta + FRAME_META_LEN as u32).to_le_bytes());
        out.extend_from_slice(&(frame.jpeg.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&frame.jpeg);
    }

    Ok(out)
}

/// Whether `bytes` starts with a plausible xV4 container.
pub fn validate(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_LEN && &bytes[0..3] == SIGNATURE && bytes[3] == VERSION
}

/// The 12-byte `"output/NNms"` timing slot, NUL-terminated and zero-padded.
fn timing_slot(interval_ms: u32) -> [u8; 12] {
    let text = format!("output/{:02}ms", clamp_interval(interval_ms));
    let mut slot = [0u8; 12];
    slot[..text.len()].copy_from_slice(text.as_bytes());
    slot
}

/// The 12-byte name slot: name plus trailing dot, zero-padded or truncated.
fn name_slot(name: &str) -> [u8; NAME_LEN] {
    let mut slot = [0u8; NAME_LEN];
    let dotted = format!("{}.", name);
    let bytes = dotted.as_bytes();
    let len = bytes.len().min(NAME_LEN);
    slot[..len].copy_from_slice(&bytes[..len]);
    slot
}

//! Inbound notification parsing.
//!
//! The device's notifications are loosely textual: sometimes a bare status
//! sentinel, sometimes JSON, occasionally prefixed with stray `0xD1` bytes
//! and NUL padding. Parsing normalizes all of that into one record without
//! ever failing; absent pieces are simply `None`.

use serde_json::Value;

use crate::config::{SENTINEL_ERROR, SENTINEL_FAIL, SENTINEL_SUCCESS};
use crate::frame::PacketType;

/// Bytes removed before any interpretation. The `0xD1` prefix is observed
/// device behavior with no documented meaning.
const STRIPPED_BYTES: [u8; 2] = [0x00, 0xD1];

/// Status sentinel found in a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Fail,
    Error,
}

/// The device-state record, sent as JSON with `"type"` equal to the
/// device-status code.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeviceStatus {
    /// Total storage in KiB.
    pub allspace_kb: u64,
    /// Free storage in KiB.
    pub freespace_kb: u64,
    pub devname: String,
    /// Display geometry as the device reports it, e.g. `"64x32"`.
    pub size: String,
    pub brand: i64,
}

/// A normalized notification.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    /// Cleaned text: stripped of NUL and `0xD1` bytes, trimmed of ASCII
    /// whitespace at both ends.
    pub text: String,
    pub status: Option<ResponseStatus>,
    pub json: Option<Value>,
    pub device_status: Option<DeviceStatus>,
}

impl ParsedResponse {
    pub fn is_success(&self) -> bool {
        self.status == Some(ResponseStatus::Success)
    }

    pub fn is_fail(&self) -> bool {
        self.status == Some(ResponseStatus::Fail)
    }

    pub fn is_error(&self) -> bool {
        self.status == Some(ResponseStatus::Error)
    }

    pub fn is_status(&self) -> bool {
        self.device_status.is_some()
    }
}

/// Normalize one notification.
pub fn parse(raw: &[u8]) -> ParsedResponse {
    let cleaned: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !STRIPPED_BYTES.contains(b))
        .collect();
    // ASCII whitespace only; the device never pads with anything wider and
    // the cleaning step must not eat multi-byte sequences.
    let text = String::from_utf8_lossy(&cleaned)
        .trim_matches(|c: char| c.is_ascii_whitespace())
        .to_string();

    let status = if text.contains(SENTINEL_SUCCESS) {
        Some(ResponseStatus::Success)
    } else if text.contains(SENTINEL_FAIL) {
        Some(ResponseStatus::Fail)
    } else if text.contains(SENTINEL_ERROR) {
        Some(ResponseStatus::Error)
    } else {
        None
    };

    let json = parse_json(&text);
    let device_status = json.as_ref().and_then(extract_device_status);

    ParsedResponse {
        text,
        status,
        json,
        device_status,
    }
}

/// Parse `text` as JSON, salvaging the first-`{`-to-last-`}` span when the
/// whole string does not parse (the device pads JSON with junk either side).
fn parse_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start >= end {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn extract_device_status(json: &Value) -> Option<DeviceStatus> {
    let kind = coerce_i64(json.get("type")?)?;
    if kind != i64::from(PacketType::DeviceStatus.code()) {
        return None;
    }
    Some(DeviceStatus {
        allspace_kb: json
            .get("allspace")
            .and_then(coerce_i64)
            .unwrap_or(0)
            .max(0) as u64,
        freespace_kb: json
            .get("freespace")
            .and_then(coerce_i64)
            .unwrap_or(0)
            .max(0) as u64,
        devname: coerce_str(json.get("devname")),
        size: coerce_str(json.get("size")),
        brand: json.get("brand").and_then(coerce_i64).unwrap_or(0),
    })
}

/// Integer, or integer-as-string. The device is not consistent.
fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_str(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

//! Wire constants, transfer limits and the tunable uploader configuration.

use std::time::Duration;

use uuid::Uuid;

use crate::transport::short_uuid;

/// Payload bytes carried by one framed packet.
pub const DEFAULT_CHUNK_SIZE: usize = 0x1F0;

/// Pause between consecutive chunk writes. The device has no windowed flow
/// control; this delay is the flow-control knob.
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(100);

/// Pause between the info announcement and the first data chunk.
pub const DEFAULT_INFO_DELAY: Duration = Duration::from_millis(10);

/// Pause between reaching `Ready` and announcing an upload. The device drops
/// the announcement if it arrives too soon after the status handshake.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_FINALIZE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Hard cap on a composed payload.
pub const MAX_PAYLOAD_SIZE: usize = 2 * 1024 * 1024;

/// Hard cap on the number of framed packets in one transmission.
pub const MAX_PACKET_COUNT: usize = 20_000;

/// Required free-space headroom over the payload size.
pub const STORAGE_MARGIN: f64 = 1.10;

/// Substring matched case-insensitively against advertised local names.
pub const DEVICE_NAME_FRAGMENT: &str = "beambox e-Badge Pulse";

/// GATT characteristic the host writes frames to.
pub const WRITE_CHAR_SHORT: u16 = 0x01F1;

/// GATT characteristic the device notifies on.
pub const NOTIFY_CHAR_SHORT: u16 = 0x01F2;

/// ASCII substrings the device embeds in notifications.
pub const SENTINEL_SUCCESS: &str = "GetPacketSuccess";
pub const SENTINEL_FAIL: &str = "PacketFail";
pub const SENTINEL_ERROR: &str = "1111111111";

/// Tunable parameters for an [`Uploader`](crate::engine::Uploader).
///
/// `default()` matches the device's observed behavior; tests and unusual
/// deployments override individual knobs through the `with_*` constructors.
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub chunk_size: usize,
    pub chunk_delay: Duration,
    pub info_delay: Duration,
    pub settle_delay: Duration,
    pub scan_timeout: Duration,
    pub status_timeout: Duration,
    pub finalize_timeout: Duration,
    pub query_timeout: Duration,
    pub max_payload_size: usize,
    pub max_packet_count: usize,
    pub device_name: String,
    pub write_char: Uuid,
    pub notify_char: Uuid,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: DEFAULT_CHUNK_DELAY,
            info_delay: DEFAULT_INFO_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
            finalize_timeout: DEFAULT_FINALIZE_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            max_payload_size: MAX_PAYLOAD_SIZE,
            max_packet_count: MAX_PACKET_COUNT,
            device_name: DEVICE_NAME_FRAGMENT.to_string(),
            write_char: short_uuid(WRITE_CHAR_SHORT),
            notify_char: short_uuid(NOTIFY_CHAR_SHORT),
        }
    }
}

impl UploaderConfig {
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn with_info_delay(mut self, delay: Duration) -> Self {
        self.info_delay = delay;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    pub fn with_finalize_timeout(mut self, timeout: Duration) -> Self {
        self.finalize_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_max_payload_size(mut self, limit: usize) -> Self {
        self.max_payload_size = limit;
        self
    }

    pub fn with_max_packet_count(mut self, limit: usize) -> Self {
        self.max_packet_count = limit;
        self
    }

    pub fn with_device_name(mut self, fragment: impl Into<String>) -> Self {
        self.device_name = fragment.into();
        self
    }

    pub fn with_write_char(mut self, uuid: Uuid) -> Self {
        self.write_char = uuid;
        self
    }

    pub fn with_notify_char(mut self, uuid: Uuid) -> Self {
        self.notify_char = uuid;
        self
    }
}

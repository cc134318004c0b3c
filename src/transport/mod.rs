//! The narrow BLE capability the engine consumes.
//!
//! The engine drives exactly one peripheral through this trait: power check,
//! scan, connect, characteristic discovery, write and a notification stream.
//! The btleplug backend lives in [`ble`]; [`fake`] is a scripted in-memory
//! device for tests.

use futures::stream::BoxStream;
use uuid::Uuid;

#[cfg(feature = "ble")]
pub mod ble;
pub mod fake;

/// The Bluetooth Base UUID with the 16-bit slot zeroed, as a u128.
const BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// Hex tail shared by every Base-UUID-derived value ("-0000-1000-8000-00805F9B34FB").
const BASE_UUID_TAIL: &str = "00001000800000805f9b34fb";

/// Adapter power state as the transport reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Unsupported,
    Unauthorized,
}

/// Hints a backend may use to narrow scan results. Matching is still done
/// by the engine; backends are free to ignore the filter.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub name_fragment: Option<String>,
    pub address: Option<String>,
}

/// One advertisement seen while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub name: Option<String>,
    /// Platform-specific peripheral address or identifier.
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub writable: bool,
    pub notifiable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub uuid: Uuid,
    pub characteristics: Vec<CharacteristicInfo>,
}

/// A BLE central, reduced to what an upload needs.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn power_state(&self) -> PowerState;

    async fn scan_start(&mut self, filter: ScanFilter) -> anyhow::Result<()>;

    async fn scan_stop(&mut self) -> anyhow::Result<()>;

    /// Advertisements observed since `scan_start`. The stream owns its
    /// resources; it stays valid across other calls on the transport.
    async fn scan_events(&mut self) -> anyhow::Result<BoxStream<'static, ScanEvent>>;

    async fn connect(&mut self, address: &str) -> anyhow::Result<()>;

    /// Services and characteristics of the connected peripheral.
    async fn discover(&mut self) -> anyhow::Result<Vec<ServiceInfo>>;

    async fn write(
        &mut self,
        characteristic: &Uuid,
        data: &[u8],
        without_response: bool,
    ) -> anyhow::Result<()>;

    /// Notification bytes from `characteristic`. Must be called before any
    /// write so no notification is lost.
    async fn subscribe(&mut self, characteristic: &Uuid)
        -> anyhow::Result<BoxStream<'static, Vec<u8>>>;

    async fn disconnect(&mut self) -> anyhow::Result<()>;
}

/// The full 128-bit UUID for a 16-bit Bluetooth SIG short form.
pub const fn short_uuid(short: u16) -> Uuid {
    Uuid::from_u128(BASE_UUID | ((short as u128) << 96))
}

/// Canonical comparison form: lowercase hex without dashes, collapsed to the
/// 4-digit short form when the value sits on the Bluetooth Base UUID.
///
/// Different BLE stacks surface the same characteristic as `0x01F1`,
/// `000001F1-0000-1000-8000-00805F9B34FB` or a dashless variant; comparing
/// raw strings misses all of those.
pub fn normalize_uuid(uuid: &Uuid) -> String {
    let simple = uuid.simple().to_string();
    if simple.starts_with("0000") && simple.ends_with(BASE_UUID_TAIL) {
        simple[4..8].to_string()
    } else {
        simple
    }
}

/// Whether two UUIDs refer to the same characteristic after normalization.
pub fn uuid_matches(a: &Uuid, b: &Uuid) -> bool {
    normalize_uuid(a) == normalize_uuid(b)
}

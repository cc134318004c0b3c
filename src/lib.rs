//! Host-side upload library for beambox e-Badge Pulse displays.
//!
//! The badge speaks a small framed protocol over one BLE write+notify
//! characteristic pair: content is packed into a binary container (`IMB` for
//! a single image, `xV4` for an animation), wrapped in a JSON-prefixed
//! envelope, split into checksummed frames and streamed with fixed
//! inter-chunk delays while device notifications update the transfer state.
//!
//! [`engine::Uploader`] drives the whole exchange over any [`transport::Transport`];
//! the btleplug backend ships behind the default `ble` feature and
//! [`transport::fake::FakeTransport`] stands in for a radio in tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod imb;
pub mod logging;
pub mod media;
pub mod payload;
pub mod response;
pub mod transport;
pub mod xv4;

pub use config::UploaderConfig;
pub use engine::{DeviceState, NotificationRecord, StatusReport, Uploader};
pub use error::Error;
pub use frame::PacketType;
pub use logging::init_logging;
pub use media::MediaKind;
pub use response::{DeviceStatus, ParsedResponse, ResponseStatus};
#[cfg(feature = "ble")]
pub use transport::ble::BleCentral;
pub use transport::Transport;

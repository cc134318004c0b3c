//! Errors surfaced by the upload core.

use std::time::Duration;

use crate::transport::PowerState;

/// Every failure a caller can distinguish.
///
/// Builders and the framer raise theirs synchronously; the engine surfaces
/// every error as the return value of the driving operation and never retries
/// silently. The protocol has no retransmission vocabulary, so callers retry
/// whole uploads, not packets.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The Bluetooth adapter is off, absent or not permitted.
    AdapterDown(PowerState),
    /// The scan window elapsed without a matching advertisement.
    DeviceNotFound { waited: Duration },
    /// The transport failed to establish the connection.
    ConnectionFailed(String),
    /// The peripheral lacks the write or notify characteristic.
    CharacteristicsMissing,
    /// A frame failed structural validation.
    ProtocolViolation(&'static str),
    /// The device raised its error sentinel; the upload was aborted.
    DeviceError,
    /// The device-reported free space cannot hold the payload.
    InsufficientStorage { needed: u64, free: u64 },
    /// The composed payload exceeds a configured limit.
    PayloadTooLarge { size: usize, limit: usize },
    /// An animation was requested with zero frames.
    EmptyAnimation,
    /// The transport refused a write.
    TransportWriteFailed(String),
    /// A bounded wait elapsed.
    Timeout(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::AdapterDown(state) => {
                write!(f, "Bluetooth adapter is not powered on ({:?})", state)
            }
            Error::DeviceNotFound { waited } => {
                write!(f, "no matching device found within {:?}", waited)
            }
            Error::ConnectionFailed(reason) => write!(f, "connection failed: {}", reason),
            Error::CharacteristicsMissing => {
                write!(f, "peripheral is missing the write or notify characteristic")
            }
            Error::ProtocolViolation(what) => write!(f, "malformed frame: {}", what),
            Error::DeviceError => write!(f, "device reported a transfer error"),
            Error::InsufficientStorage { needed, free } => write!(
                f,
                "insufficient storage on device: need {} bytes, {} free",
                needed, free
            ),
            Error::PayloadTooLarge { size, limit } => {
                write!(f, "payload of {} bytes exceeds limit of {}", size, limit)
            }
            Error::EmptyAnimation => write!(f, "animation has no frames"),
            Error::TransportWriteFailed(reason) => write!(f, "transport write failed: {}", reason),
            Error::Timeout(what) => write!(f, "timed out waiting for {}", what),
        }
    }
}

impl std::error::Error for Error {}

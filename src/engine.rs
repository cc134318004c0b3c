//! The upload engine: one device, one strictly ordered state machine.
//!
//! Two tasks touch the engine's world. The upload task (the caller's) walks
//! `connect` → `upload_*` → `disconnect` sequentially. The notify task,
//! spawned when the engine subscribes, parses every inbound notification and
//! updates a small shared record. Notifications are fire-and-forget state
//! updates, not per-chunk acknowledgements: the upload loop never blocks
//! waiting for a SUCCESS, it only watches the latched error flag at chunk
//! boundaries and races the final notification against a timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::{UploaderConfig, STORAGE_MARGIN};
use crate::error::Error;
use crate::frame::{self, PacketType};
use crate::payload;
use crate::response::{self, DeviceStatus, ParsedResponse};
use crate::transport::{uuid_matches, PowerState, ScanEvent, ScanFilter, Transport};
use crate::xv4;

/// Where the engine currently stands. Every transition is made by the
/// upload task; the notify task only touches the shared flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Idle,
    Scanning,
    Connecting,
    Discovering,
    AwaitingStatus,
    Ready,
    AnnouncingInfo,
    Streaming {
        total: usize,
        sent: usize,
        errored: bool,
    },
    Finalizing,
    Closed,
}

/// One inbound notification, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub at: Instant,
    pub raw: Vec<u8>,
    pub parsed: ParsedResponse,
}

/// Result of [`Uploader::query_status`].
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: DeviceStatus,
    pub notifications: Vec<NotificationRecord>,
}

type ProgressFn = Box<dyn Fn(f32) + Send + Sync>;

/// State shared with the notify task. The notify task is the sole writer of
/// the flags, the status record and the log; the upload task is the sole
/// writer of the waiters.
struct NotifyShared {
    errored: AtomicBool,
    device_ready: AtomicBool,
    device_status: Mutex<Option<DeviceStatus>>,
    notifications: Mutex<Vec<NotificationRecord>>,
    notification_waiter: Mutex<Option<oneshot::Sender<ParsedResponse>>>,
    status_waiter: Mutex<Option<oneshot::Sender<DeviceStatus>>>,
}

impl NotifyShared {
    fn new() -> Self {
        Self {
            errored: AtomicBool::new(false),
            device_ready: AtomicBool::new(false),
            device_status: Mutex::new(None),
            notifications: Mutex::new(Vec::new()),
            notification_waiter: Mutex::new(None),
            status_waiter: Mutex::new(None),
        }
    }

    fn handle_notification(&self, raw: Vec<u8>) {
        let parsed = response::parse(&raw);

        if parsed.is_error() && !self.errored.swap(true, Ordering::SeqCst) {
            warn!("Device raised the transfer error sentinel");
        }

        if let Some(status) = &parsed.device_status {
            // Only the first status promotes the device; later ones are the
            // device re-announcing itself.
            if !self.device_ready.swap(true, Ordering::SeqCst) {
                info!(
                    "Device status: '{}' {} KiB free of {} KiB, panel {}",
                    status.devname, status.freespace_kb, status.allspace_kb, status.size
                );
                *self.device_status.lock().unwrap() = Some(status.clone());
                if let Some(waiter) = self.status_waiter.lock().unwrap().take() {
                    let _ = waiter.send(status.clone());
                }
            } else {
                debug!("Duplicate device status ignored");
            }
        }

        self.notifications.lock().unwrap().push(NotificationRecord {
            at: Instant::now(),
            raw,
            parsed: parsed.clone(),
        });

        if let Some(waiter) = self.notification_waiter.lock().unwrap().take() {
            let _ = waiter.send(parsed);
        }
    }
}

/// Drives one e-Badge through scan, connect, announce, chunked stream and
/// finalize, over whatever [`Transport`] the environment supplies.
pub struct Uploader {
    transport: Box<dyn Transport>,
    config: UploaderConfig,
    state: DeviceState,
    shared: Arc<NotifyShared>,
    write_char: Option<Uuid>,
    notify_task: Option<JoinHandle<()>>,
    progress: Option<ProgressFn>,
}

impl Uploader {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self::with_config(transport, UploaderConfig::default())
    }

    pub fn with_config(transport: Box<dyn Transport>, config: UploaderConfig) -> Self {
        Self {
            transport,
            config,
            state: DeviceState::Idle,
            shared: Arc::new(NotifyShared::new()),
            write_char: None,
            notify_task: None,
            progress: None,
        }
    }

    /// Register a progress callback. It observes monotonically non-decreasing
    /// percentages in `[0, 100]`; a successful upload always ends on 100.
    pub fn on_progress<F: Fn(f32) + Send + Sync + 'static>(&mut self, callback: F) {
        self.progress = Some(Box::new(callback));
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// The first device-status record received, if any.
    pub fn device_status(&self) -> Option<DeviceStatus> {
        self.shared.device_status.lock().unwrap().clone()
    }

    /// Scan, connect, discover characteristics, subscribe and wait for the
    /// device to announce itself.
    ///
    /// With an explicit `address` the scan matches on it; otherwise any
    /// peripheral whose advertised name contains the configured fragment
    /// (case-insensitively) is taken. The notify subscription is in place
    /// before anything is written. A missing initial status is a warning,
    /// not an error: the device sometimes proceeds without one.
    pub async fn connect(&mut self, address: Option<&str>) -> Result<(), Error> {
        if !matches!(self.state, DeviceState::Idle | DeviceState::Closed) {
            return Err(Error::ConnectionFailed("already connected".to_string()));
        }

        let power = self.transport.power_state().await;
        if power != PowerState::PoweredOn {
            return Err(Error::AdapterDown(power));
        }

        self.state = DeviceState::Scanning;
        info!(
            "Scanning for '{}'",
            address.unwrap_or(&self.config.device_name)
        );
        let filter = ScanFilter {
            name_fragment: Some(self.config.device_name.clone()),
            address: address.map(String::from),
        };
        self.transport
            .scan_start(filter)
            .await
            .map_err(|e| Error::ConnectionFailed(e.to_string()))?;
        let found = self.scan_for_device(address).await;
        let _ = self.transport.scan_stop().await;

        let device = match found {
            Some(event) => event,
            None => {
                self.state = DeviceState::Idle;
                return Err(Error::DeviceNotFound {
                    waited: self.config.scan_timeout,
                });
            }
        };
        info!(
            "Found '{}' at {}",
            device.name.as_deref().unwrap_or("<unnamed>"),
            device.address
        );

        self.state = DeviceState::Connecting;
        if let Err(e) = self.transport.connect(&device.address).await {
            self.state = DeviceState::Idle;
            return Err(Error::ConnectionFailed(e.to_string()));
        }
        info!("Connected to {}", device.address);

        self.state = DeviceState::Discovering;
        let services = match self.transport.discover().await {
            Ok(services) => services,
            Err(e) => {
                let _ = self.transport.disconnect().await;
                self.state = DeviceState::Idle;
                return Err(Error::ConnectionFailed(e.to_string()));
            }
        };

        let mut write_char = None;
        let mut notify_char = None;
        for service in &services {
            for characteristic in &service.characteristics {
                if uuid_matches(&characteristic.uuid, &self.config.write_char) {
                    write_char = Some(characteristic.uuid);
                }
                if uuid_matches(&characteristic.uuid, &self.config.notify_char) {
                    notify_char = Some(characteristic.uuid);
                }
            }
        }
        let (write_char, notify_char) = match (write_char, notify_char) {
            (Some(w), Some(n)) => (w, n),
            _ => {
                let _ = self.transport.disconnect().await;
                self.state = DeviceState::Idle;
                return Err(Error::CharacteristicsMissing);
            }
        };
        debug!("Matched write {} / notify {}", write_char, notify_char);

        let stream = match self.transport.subscribe(&notify_char).await {
            Ok(stream) => stream,
            Err(e) => {
                let _ = self.transport.disconnect().await;
                self.state = DeviceState::Idle;
                return Err(Error::ConnectionFailed(e.to_string()));
            }
        };
        self.spawn_notify_task(stream);
        self.write_char = Some(write_char);

        self.state = DeviceState::AwaitingStatus;
        debug!("Waiting for the initial device status");
        if self
            .wait_for_status(self.config.status_timeout)
            .await
            .is_none()
        {
            warn!(
                "No device status within {:?}; proceeding anyway",
                self.config.status_timeout
            );
        }
        self.state = DeviceState::Ready;
        Ok(())
    }

    /// The latest device-status plus everything the device has notified
    /// since subscription, waiting up to `wait` (default 10 s) for a status
    /// to arrive if none has. A wait that elapses with no status ever
    /// received is a [`Error::Timeout`]; unlike the connect-time wait, the
    /// caller asked for the record specifically.
    pub async fn query_status(&mut self, wait: Option<Duration>) -> Result<StatusReport, Error> {
        if self.state != DeviceState::Ready {
            return Err(Error::ConnectionFailed("no device connected".to_string()));
        }
        let wait = wait.unwrap_or(self.config.query_timeout);
        let status = self
            .wait_for_status(wait)
            .await
            .ok_or(Error::Timeout("device status"))?;
        let notifications = self.shared.notifications.lock().unwrap().clone();
        Ok(StatusReport {
            status,
            notifications,
        })
    }

    /// Upload one pre-encoded JPEG at the display geometry `size`.
    pub async fn upload_image(&mut self, jpeg: &[u8], size: (u16, u16)) -> Result<(), Error> {
        info!(
            "Uploading image: {} bytes at {}x{}",
            jpeg.len(),
            size.0,
            size.1
        );
        let data = payload::image_data(jpeg, size, PacketType::Image);
        self.stream_payload(data, PacketType::Image).await
    }

    /// Upload an ordered sequence of JPEG frames as a looping animation
    /// played at `interval_ms` per frame (clamped by the container format).
    pub async fn upload_animation(
        &mut self,
        frames: &[Vec<u8>],
        interval_ms: u32,
        size: (u16, u16),
    ) -> Result<(), Error> {
        info!(
            "Uploading animation: {} frames at {}x{}",
            frames.len(),
            size.0,
            size.1
        );
        let named: Vec<xv4::Frame> = frames
            .iter()
            .enumerate()
            .map(|(i, jpeg)| xv4::Frame::new(xv4::frame_name(i + 1), jpeg.clone()))
            .collect();
        let data = payload::animation_data(&named, interval_ms, size)?;
        self.stream_payload(data, PacketType::DynamicAmbience).await
    }

    /// Tear everything down. Safe to call at any time, any number of times.
    pub async fn disconnect(&mut self) {
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
        if matches!(self.state, DeviceState::Scanning) {
            let _ = self.transport.scan_stop().await;
        }
        let _ = self.transport.disconnect().await;
        self.write_char = None;
        self.state = DeviceState::Closed;
    }

    async fn scan_for_device(&mut self, address: Option<&str>) -> Option<ScanEvent> {
        let mut events = match self.transport.scan_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!("Scan event stream unavailable: {}", e);
                return None;
            }
        };
        let wanted = self.config.device_name.to_lowercase();
        let deadline = tokio::time::Instant::now() + self.config.scan_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            match timeout(remaining, events.next()).await {
                Ok(Some(event)) => {
                    let matched = match address {
                        Some(addr) => event.address.eq_ignore_ascii_case(addr),
                        None => event
                            .name
                            .as_deref()
                            .map(|n| n.to_lowercase().contains(&wanted))
                            .unwrap_or(false),
                    };
                    if matched {
                        return Some(event);
                    }
                    debug!("Ignoring advertisement from {}", event.address);
                }
                // Stream exhausted: nothing more will be advertised, but the
                // contract is a bounded wait, so sit out the window.
                Ok(None) => {
                    tokio::time::sleep(remaining).await;
                    return None;
                }
                Err(_) => return None,
            }
        }
    }

    fn spawn_notify_task(&mut self, mut stream: BoxStream<'static, Vec<u8>>) {
        let shared = self.shared.clone();
        self.notify_task = Some(tokio::spawn(async move {
            while let Some(bytes) = stream.next().await {
                shared.handle_notification(bytes);
            }
            debug!("Notification stream ended");
        }));
    }

    /// Resolve as soon as a device-status exists, or `None` after `wait`.
    async fn wait_for_status(&self, wait: Duration) -> Option<DeviceStatus> {
        if let Some(status) = self.shared.device_status.lock().unwrap().clone() {
            return Some(status);
        }
        let (tx, rx) = oneshot::channel();
        *self.shared.status_waiter.lock().unwrap() = Some(tx);
        // The status may have landed between the check and the install.
        if let Some(status) = self.shared.device_status.lock().unwrap().clone() {
            self.shared.status_waiter.lock().unwrap().take();
            return Some(status);
        }
        match timeout(wait, rx).await {
            Ok(Ok(status)) => Some(status),
            _ => {
                self.shared.status_waiter.lock().unwrap().take();
                None
            }
        }
    }

    /// Resolve on the next notification, or `None` after `wait`.
    async fn wait_for_notification(&self, wait: Duration) -> Option<ParsedResponse> {
        let (tx, rx) = oneshot::channel();
        *self.shared.notification_waiter.lock().unwrap() = Some(tx);
        match timeout(wait, rx).await {
            Ok(Ok(parsed)) => Some(parsed),
            _ => {
                self.shared.notification_waiter.lock().unwrap().take();
                None
            }
        }
    }

    async fn stream_payload(&mut self, data: Vec<u8>, subtype: PacketType) -> Result<(), Error> {
        if self.state != DeviceState::Ready {
            return Err(Error::ConnectionFailed("no device connected".to_string()));
        }
        let write_char = self
            .write_char
            .ok_or_else(|| Error::ConnectionFailed("write characteristic unresolved".to_string()))?;

        // Device-side race: an announcement sent straight after the status
        // handshake is dropped.
        tokio::time::sleep(self.config.settle_delay).await;

        let chunk_size = self.config.chunk_size;
        let total = data.len().div_ceil(chunk_size);
        if data.len() > self.config.max_payload_size {
            return Err(Error::PayloadTooLarge {
                size: data.len(),
                limit: self.config.max_payload_size,
            });
        }
        if total > self.config.max_packet_count {
            return Err(Error::PayloadTooLarge {
                size: total,
                limit: self.config.max_packet_count,
            });
        }

        if let Some(status) = self.shared.device_status.lock().unwrap().clone() {
            let needed = (data.len() as f64 * STORAGE_MARGIN) as u64;
            let free = status.freespace_kb * 1024;
            if free < needed {
                return Err(Error::InsufficientStorage { needed, free });
            }
        }

        self.shared.errored.store(false, Ordering::SeqCst);

        self.state = DeviceState::AnnouncingInfo;
        let announcement = payload::image_info(PacketType::Image, 1);
        let info_frame = frame::build(PacketType::Image, 0, 0, &announcement);
        self.transport
            .write(&write_char, &info_frame, true)
            .await
            .map_err(|e| Error::TransportWriteFailed(e.to_string()))?;
        info!(
            "Announced transfer: {} bytes in {} packets",
            data.len(),
            total
        );
        tokio::time::sleep(self.config.info_delay).await;

        self.state = DeviceState::Streaming {
            total,
            sent: 0,
            errored: false,
        };
        for (i, chunk) in data.chunks(chunk_size).enumerate() {
            let packet = frame::build(subtype, total as u32, (total - 1 - i) as u32, chunk);
            self.transport
                .write(&write_char, &packet, true)
                .await
                .map_err(|e| Error::TransportWriteFailed(e.to_string()))?;
            if self.shared.errored.load(Ordering::SeqCst) {
                warn!("Aborting: device flagged an error at packet {}/{}", i + 1, total);
                self.disconnect().await;
                return Err(Error::DeviceError);
            }
            self.state = DeviceState::Streaming {
                total,
                sent: i + 1,
                errored: false,
            };
            if let Some(progress) = &self.progress {
                progress((i + 1) as f32 * 100.0 / total as f32);
            }
            debug!("Sent packet {}/{}", i + 1, total);
            tokio::time::sleep(self.config.chunk_delay).await;
        }

        self.state = DeviceState::Finalizing;
        if self
            .wait_for_notification(self.config.finalize_timeout)
            .await
            .is_none()
        {
            warn!(
                "No acknowledgement within {:?} of the final packet",
                self.config.finalize_timeout
            );
        }
        if self.shared.errored.load(Ordering::SeqCst) {
            self.disconnect().await;
            return Err(Error::DeviceError);
        }
        self.state = DeviceState::Ready;
        info!("Transfer complete");
        Ok(())
    }
}

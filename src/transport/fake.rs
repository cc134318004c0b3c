//! Scripted in-memory transport for exercising the engine without a radio.
//!
//! [`FakeTransport`] plays the device side: it records every write and
//! yields whatever notifications the test pushes through its [`FakeHandle`].
//! Defaults describe a healthy badge (powered adapter, one advertised
//! device, write+notify characteristics present).

use std::sync::{Arc, Mutex};

use anyhow::bail;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{
    short_uuid, CharacteristicInfo, PowerState, ScanEvent, ScanFilter, ServiceInfo, Transport,
};
use crate::config::{NOTIFY_CHAR_SHORT, WRITE_CHAR_SHORT};

/// One recorded GATT write.
#[derive(Debug, Clone)]
pub struct WriteRecord {
    pub characteristic: Uuid,
    pub data: Vec<u8>,
    pub without_response: bool,
}

struct Inner {
    power: PowerState,
    scan_results: Vec<ScanEvent>,
    services: Vec<ServiceInfo>,
    writes: Vec<WriteRecord>,
    scanning: bool,
    connected: bool,
    subscribed: Option<Uuid>,
    fail_connect: bool,
    fail_writes_after: Option<usize>,
}

pub struct FakeTransport {
    inner: Arc<Mutex<Inner>>,
    notify_rx: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
}

/// Test-side handle: inject notifications, reconfigure the script, inspect
/// what the engine wrote.
#[derive(Clone)]
pub struct FakeHandle {
    inner: Arc<Mutex<Inner>>,
    notify_tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl FakeTransport {
    pub fn new() -> (Self, FakeHandle) {
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Mutex::new(Inner {
            power: PowerState::PoweredOn,
            scan_results: vec![ScanEvent {
                name: Some("beambox e-Badge Pulse 0042".to_string()),
                address: "AA:BB:CC:DD:EE:FF".to_string(),
            }],
            services: vec![ServiceInfo {
                uuid: short_uuid(0xFFF0),
                characteristics: vec![
                    CharacteristicInfo {
                        uuid: short_uuid(WRITE_CHAR_SHORT),
                        writable: true,
                        notifiable: false,
                    },
                    CharacteristicInfo {
                        uuid: short_uuid(NOTIFY_CHAR_SHORT),
                        writable: false,
                        notifiable: true,
                    },
                ],
            }],
            writes: Vec::new(),
            scanning: false,
            connected: false,
            subscribed: None,
            fail_connect: false,
            fail_writes_after: None,
        }));
        let handle = FakeHandle {
            inner: inner.clone(),
            notify_tx,
        };
        (
            Self {
                inner,
                notify_rx: Some(notify_rx),
            },
            handle,
        )
    }
}

impl FakeHandle {
    /// Queue notification bytes for the engine's notify stream. Bytes pushed
    /// before the engine subscribes are buffered and delivered in order.
    pub fn push_notification(&self, bytes: impl Into<Vec<u8>>) {
        let _ = self.notify_tx.send(bytes.into());
    }

    pub fn set_power(&self, power: PowerState) {
        self.inner.lock().unwrap().power = power;
    }

    pub fn set_scan_results(&self, results: Vec<ScanEvent>) {
        self.inner.lock().unwrap().scan_results = results;
    }

    pub fn set_services(&self, services: Vec<ServiceInfo>) {
        self.inner.lock().unwrap().services = services;
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.inner.lock().unwrap().fail_connect = fail;
    }

    /// Refuse every write after the first `n` succeed.
    pub fn fail_writes_after(&self, n: usize) {
        self.inner.lock().unwrap().fail_writes_after = Some(n);
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    pub fn is_scanning(&self) -> bool {
        self.inner.lock().unwrap().scanning
    }

    pub fn subscribed_char(&self) -> Option<Uuid> {
        self.inner.lock().unwrap().subscribed
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn power_state(&self) -> PowerState {
        self.inner.lock().unwrap().power
    }

    async fn scan_start(&mut self, _filter: ScanFilter) -> anyhow::Result<()> {
        self.inner.lock().unwrap().scanning = true;
        Ok(())
    }

    async fn scan_stop(&mut self) -> anyhow::Result<()> {
        self.inner.lock().unwrap().scanning = false;
        Ok(())
    }

    async fn scan_events(&mut self) -> anyhow::Result<BoxStream<'static, ScanEvent>> {
        let events = self.inner.lock().unwrap().scan_results.clone();
        Ok(Box::pin(futures::stream::iter(events)))
    }

    async fn connect(&mut self, _address: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_connect {
            bail!("peripheral refused the connection");
        }
        inner.connected = true;
        Ok(())
    }

    async fn discover(&mut self) -> anyhow::Result<Vec<ServiceInfo>> {
        let inner = self.inner.lock().unwrap();
        if !inner.connected {
            bail!("not connected");
        }
        Ok(inner.services.clone())
    }

    async fn write(
        &mut self,
        characteristic: &Uuid,
        data: &[u8],
        without_response: bool,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected {
            bail!("not connected");
        }
        if let Some(limit) = inner.fail_writes_after {
            if inner.writes.len() >= limit {
                bail!("device rejected the write");
            }
        }
        inner.writes.push(WriteRecord {
            characteristic: *characteristic,
            data: data.to_vec(),
            without_response,
        });
        Ok(())
    }

    async fn subscribe(
        &mut self,
        characteristic: &Uuid,
    ) -> anyhow::Result<BoxStream<'static, Vec<u8>>> {
        let rx = match self.notify_rx.take() {
            Some(rx) => rx,
            None => bail!("already subscribed"),
        };
        self.inner.lock().unwrap().subscribed = Some(*characteristic);
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|bytes| (bytes, rx))
        });
        Ok(Box::pin(stream))
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        inner.scanning = false;
        inner.subscribed = None;
        Ok(())
    }
}

#![cfg(feature = "ble")]

//! btleplug-backed transport.
//!
//! Scanning runs unfiltered and polls the adapter's peripheral cache rather
//! than relying on platform scan filters; CoreBluetooth in particular does
//! not reliably match UUID filters in scan response data. Matching against
//! the configured name fragment or address happens in the engine.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use btleplug::api::{
    Central, CentralState, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter as BtScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{CharacteristicInfo, PowerState, ScanEvent, ScanFilter, ServiceInfo, Transport};

/// How often the scan task re-reads the adapter's peripheral cache.
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(500);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DISCOVER_TIMEOUT: Duration = Duration::from_secs(10);

/// A BLE central over the first available system adapter.
pub struct BleCentral {
    adapter: Adapter,
    peripheral: Option<Peripheral>,
    subscribed: Option<Characteristic>,
    scanning: Arc<AtomicBool>,
}

impl BleCentral {
    pub async fn new() -> anyhow::Result<Self> {
        let manager = Manager::new().await.context("creating BLE manager")?;
        let adapter = manager
            .adapters()
            .await
            .context("listing BLE adapters")?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no Bluetooth adapter present"))?;
        Ok(Self {
            adapter,
            peripheral: None,
            subscribed: None,
            scanning: Arc::new(AtomicBool::new(false)),
        })
    }

    fn connected(&self) -> anyhow::Result<&Peripheral> {
        self.peripheral
            .as_ref()
            .ok_or_else(|| anyhow!("no peripheral connected"))
    }

    fn characteristic(&self, uuid: &Uuid) -> anyhow::Result<Characteristic> {
        let peripheral = self.connected()?;
        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == *uuid)
            .ok_or_else(|| anyhow!("characteristic {} not present", uuid))
    }
}

#[async_trait::async_trait]
impl Transport for BleCentral {
    async fn power_state(&self) -> PowerState {
        match self.adapter.adapter_state().await {
            Ok(CentralState::PoweredOn) => PowerState::PoweredOn,
            Ok(CentralState::PoweredOff) => PowerState::PoweredOff,
            // Several platforms report Unknown until first use; treat it as
            // usable and let the connect attempt decide.
            Ok(_) => PowerState::PoweredOn,
            Err(e) => {
                warn!("Could not read adapter state: {}", e);
                PowerState::Unsupported
            }
        }
    }

    async fn scan_start(&mut self, _filter: ScanFilter) -> anyhow::Result<()> {
        self.adapter
            .start_scan(BtScanFilter::default())
            .await
            .context("starting BLE scan")?;
        self.scanning.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn scan_stop(&mut self) -> anyhow::Result<()> {
        self.scanning.store(false, Ordering::SeqCst);
        self.adapter.stop_scan().await.context("stopping BLE scan")
    }

    async fn scan_events(&mut self) -> anyhow::Result<BoxStream<'static, ScanEvent>> {
        let (tx, rx) = mpsc::channel(32);
        let adapter = self.adapter.clone();
        let scanning = self.scanning.clone();

        tokio::spawn(async move {
            let mut seen = HashSet::new();
            while scanning.load(Ordering::SeqCst) {
                tokio::time::sleep(SCAN_POLL_INTERVAL).await;
                let peripherals = match adapter.peripherals().await {
                    Ok(p) => p,
                    Err(e) => {
                        debug!("Peripheral listing failed mid-scan: {}", e);
                        break;
                    }
                };
                for peripheral in peripherals {
                    let address = peripheral.id().to_string();
                    if !seen.insert(address.clone()) {
                        continue;
                    }
                    let name = peripheral
                        .properties()
                        .await
                        .ok()
                        .flatten()
                        .and_then(|p| p.local_name);
                    if tx.send(ScanEvent { name, address }).await.is_err() {
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|ev| (ev, rx))
        });
        Ok(Box::pin(stream))
    }

    async fn connect(&mut self, address: &str) -> anyhow::Result<()> {
        let peripheral = self
            .adapter
            .peripherals()
            .await
            .context("listing peripherals")?
            .into_iter()
            .find(|p| p.id().to_string() == address)
            .ok_or_else(|| anyhow!("peripheral '{}' not in adapter cache", address))?;

        match tokio::time::timeout(CONNECT_TIMEOUT, peripheral.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => bail!("connect failed: {}", e),
            Err(_) => {
                let _ = peripheral.disconnect().await;
                bail!("connect timed out after {:?}", CONNECT_TIMEOUT);
            }
        }
        self.peripheral = Some(peripheral);
        Ok(())
    }

    async fn discover(&mut self) -> anyhow::Result<Vec<ServiceInfo>> {
        let peripheral = self.connected()?;
        match tokio::time::timeout(DISCOVER_TIMEOUT, peripheral.discover_services()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => bail!("service discovery failed: {}", e),
            Err(_) => bail!("service discovery timed out after {:?}", DISCOVER_TIMEOUT),
        }

        let services = peripheral
            .services()
            .into_iter()
            .map(|s| ServiceInfo {
                uuid: s.uuid,
                characteristics: s
                    .characteristics
                    .into_iter()
                    .map(|c| CharacteristicInfo {
                        uuid: c.uuid,
                        writable: c.properties.intersects(
                            CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE,
                        ),
                        notifiable: c.properties.contains(CharPropFlags::NOTIFY),
                    })
                    .collect(),
            })
            .collect();
        Ok(services)
    }

    async fn write(
        &mut self,
        characteristic: &Uuid,
        data: &[u8],
        without_response: bool,
    ) -> anyhow::Result<()> {
        let target = self.characteristic(characteristic)?;
        let write_type = if without_response {
            WriteType::WithoutResponse
        } else {
            WriteType::WithResponse
        };
        self.connected()?
            .write(&target, data, write_type)
            .await
            .context("GATT write")
    }

    async fn subscribe(
        &mut self,
        characteristic: &Uuid,
    ) -> anyhow::Result<BoxStream<'static, Vec<u8>>> {
        let target = self.characteristic(characteristic)?;
        let peripheral = self.connected()?;
        peripheral
            .subscribe(&target)
            .await
            .context("subscribing to notifications")?;

        let uuid = target.uuid;
        let notifications = peripheral
            .notifications()
            .await
            .context("opening notification stream")?;
        self.subscribed = Some(target);

        let stream = notifications.filter_map(move |n| async move {
            if n.uuid == uuid {
                Some(n.value)
            } else {
                None
            }
        });
        Ok(Box::pin(stream))
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        if self.scanning.swap(false, Ordering::SeqCst) {
            let _ = self.adapter.stop_scan().await;
        }
        if let Some(peripheral) = self.peripheral.take() {
            if let Some(characteristic) = self.subscribed.take() {
                let _ = peripheral.unsubscribe(&characteristic).await;
            }
            let _ = peripheral.disconnect().await;
        }
        Ok(())
    }
}

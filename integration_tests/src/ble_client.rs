//! BLE client for talking to the button board over its UART service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use btleplug::api::{
    Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

/// UART service UUIDs (Nordic UART Service layout)
pub const UART_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e);
pub const UART_RX_UUID: Uuid = Uuid::from_u128(0x6e400002_b5a3_f393_e0a9_e50e24dcca9e); // Write to device
pub const UART_TX_UUID: Uuid = Uuid::from_u128(0x6e400003_b5a3_f393_e0a9_e50e24dcca9e); // Notify from device

/// BLE client for the button board.
pub struct BleClient {
    peripheral: Peripheral,
    rx_char: Characteristic,
    tx_char: Characteristic,
    /// Notifications received on TX, one entry per notification
    notifications: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BleClient {
    /// Scan for a device by name and connect.
    pub async fn connect_by_name(name: &str, scan_timeout: Duration) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapters found"))?;

        // Only devices advertising the UART service
        adapter
            .start_scan(ScanFilter {
                services: vec![UART_SERVICE_UUID],
            })
            .await?;

        let peripheral = Self::find_device_by_name(&adapter, name, scan_timeout).await?;

        adapter.stop_scan().await?;

        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let characteristics = peripheral.characteristics();

        let rx_char = characteristics
            .iter()
            .find(|c| c.uuid == UART_RX_UUID)
            .cloned()
            .ok_or_else(|| anyhow!("UART RX characteristic not found"))?;

        let tx_char = characteristics
            .iter()
            .find(|c| c.uuid == UART_TX_UUID)
            .cloned()
            .ok_or_else(|| anyhow!("UART TX characteristic not found"))?;

        peripheral.subscribe(&tx_char).await?;

        let notifications = Arc::new(Mutex::new(Vec::new()));

        let sink = notifications.clone();
        let peripheral_clone = peripheral.clone();
        tokio::spawn(async move {
            let mut stream = match peripheral_clone.notifications().await {
                Ok(s) => s,
                Err(_) => return,
            };

            while let Some(data) = stream.next().await {
                if data.uuid == UART_TX_UUID {
                    sink.lock().await.push(data.value);
                }
            }
        });

        Ok(Self {
            peripheral,
            rx_char,
            tx_char,
            notifications,
        })
    }

    /// Find a device by name within the scan timeout.
    async fn find_device_by_name(
        adapter: &Adapter,
        name: &str,
        scan_timeout: Duration,
    ) -> Result<Peripheral> {
        let start = std::time::Instant::now();

        while start.elapsed() < scan_timeout {
            let peripherals = adapter.peripherals().await?;

            for peripheral in peripherals {
                if let Some(props) = peripheral.properties().await? {
                    if props.local_name.as_deref() == Some(name) {
                        return Ok(peripheral);
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(anyhow!("Device '{}' not found within timeout", name))
    }

    pub fn rx_properties(&self) -> CharPropFlags {
        self.rx_char.properties
    }

    pub fn tx_properties(&self) -> CharPropFlags {
        self.tx_char.properties
    }

    /// Write bytes to the RX characteristic.
    pub async fn write_rx(&self, data: &[u8], write_type: WriteType) -> Result<()> {
        self.peripheral.write(&self.rx_char, data, write_type).await?;
        Ok(())
    }

    /// Wait until a notification equal to `expected` arrives.
    ///
    /// Other notifications received in the meantime are discarded.
    pub async fn wait_for_notification(&self, expected: &[u8], wait: Duration) -> Result<()> {
        let result = timeout(wait, async {
            loop {
                {
                    let mut received = self.notifications.lock().await;
                    if let Some(pos) = received.iter().position(|n| n.as_slice() == expected) {
                        received.drain(..=pos);
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        result.map_err(|_| {
            anyhow!(
                "Timeout waiting for notification {:?}",
                String::from_utf8_lossy(expected)
            )
        })
    }

    /// Wait for `window` and return every notification received meanwhile.
    pub async fn collect_notifications(&self, window: Duration) -> Vec<Vec<u8>> {
        self.clear_buffer().await;
        tokio::time::sleep(window).await;
        std::mem::take(&mut *self.notifications.lock().await)
    }

    /// Disconnect from the device.
    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral.unsubscribe(&self.tx_char).await?;
        self.peripheral.disconnect().await?;
        Ok(())
    }

    /// Clear any pending notifications from the buffer.
    pub async fn clear_buffer(&self) {
        self.notifications.lock().await.clear();
    }
}

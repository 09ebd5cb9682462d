//! BLE UART peripheral
//!
//! Registers the UART service, tracks open connections, keeps the device
//! advertising whenever a link closes and hands RX writes to a single
//! callback.

use alloc::boxed::Box;

use heapless::index_set::FnvIndexSet;

use crate::ble::advertising::AdvertisingPayload;
use crate::ble::events::{BleEvent, ConnHandle, UartHandles};
use crate::ble::traits::{BleError, BleStack};
use crate::config::ble::{ADV_INTERVAL_US, MAX_CONNECTIONS, UART_SERVICE_UUID};

/// Callback invoked with the bytes of each RX write
pub type WriteCallback = Box<dyn FnMut(&[u8])>;

/// BLE peripheral exposing one UART service
///
/// Connection state per handle is absent or connected. Any number of
/// centrals up to [`MAX_CONNECTIONS`] can be connected; notifications go
/// to all of them.
pub struct BlePeripheral<S> {
    stack: S,
    handles: UartHandles,
    connections: FnvIndexSet<ConnHandle, MAX_CONNECTIONS>,
    write_callback: Option<WriteCallback>,
    payload: AdvertisingPayload,
}

impl<S: BleStack> BlePeripheral<S> {
    /// Bring up the radio, register the service and start advertising as `name`
    pub async fn new(mut stack: S, name: &str) -> Result<Self, BleError> {
        stack.activate().await?;
        let handles = stack.register_uart_service().await?;
        let payload = AdvertisingPayload::new(name, &[UART_SERVICE_UUID])?;

        let mut peripheral = Self {
            stack,
            handles,
            connections: FnvIndexSet::new(),
            write_callback: None,
            payload,
        };
        peripheral.advertise().await?;

        Ok(peripheral)
    }

    /// Apply one event reported by the radio stack
    pub async fn handle_event(&mut self, event: BleEvent) -> Result<(), BleError> {
        match event {
            BleEvent::Connect { handle } => {
                log::info!("New connection {}", handle);
                self.connections
                    .insert(handle)
                    .map_err(|_| BleError::TooManyConnections)?;
                Ok(())
            }
            BleEvent::Disconnect { handle } => {
                log::info!("Disconnected {}", handle);
                if !self.connections.remove(&handle) {
                    return Err(BleError::UnknownConnection(handle));
                }
                // Advertise again so another central can connect
                self.advertise().await
            }
            BleEvent::Write {
                conn_handle,
                value_handle,
                data,
            } => {
                log::debug!("Write from {} to handle {}", conn_handle, value_handle.0);
                if value_handle == self.handles.rx {
                    if let Some(callback) = self.write_callback.as_mut() {
                        callback(data.as_slice());
                    }
                }
                Ok(())
            }
            BleEvent::Fault { error } => {
                log::error!("BLE stack fault: {:?}", error);
                Err(error)
            }
        }
    }

    /// Notify `data` on TX to every connected central
    ///
    /// Sends nothing when no central is connected. Payloads larger than the
    /// link MTU are passed through unchanged.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), BleError> {
        for &conn in self.connections.iter() {
            self.stack.notify(conn, self.handles.tx, data).await?;
        }
        Ok(())
    }

    /// Returns true if at least one central is connected
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    /// Register the RX write callback, replacing any previous one
    pub fn on_write<F: FnMut(&[u8]) + 'static>(&mut self, callback: F) {
        self.write_callback = Some(Box::new(callback));
    }

    /// Currently open connections, in no particular order
    pub fn connections(&self) -> impl Iterator<Item = ConnHandle> + '_ {
        self.connections.iter().copied()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Characteristic handles of the registered service
    pub fn handles(&self) -> UartHandles {
        self.handles
    }

    pub fn advertising_payload(&self) -> &AdvertisingPayload {
        &self.payload
    }

    /// Borrow the underlying stack
    pub fn stack(&self) -> &S {
        &self.stack
    }

    async fn advertise(&mut self) -> Result<(), BleError> {
        log::info!("Starting advertising");
        self.stack
            .advertise(ADV_INTERVAL_US, self.payload.as_bytes())
            .await
    }
}

//! Channels between the application task and the radio task
//!
//! The application owns the [`BlePeripheral`](crate::ble::BlePeripheral)
//! and talks to the radio only through these statics:
//! - `BLE_EVENT_CHANNEL`: radio → application, typed [`BleEvent`]s
//! - `RADIO_COMMAND_CHANNEL`: application → radio, [`RadioCommand`]s
//! - `RADIO_READY` / `SERVICE_HANDLES`: one-shot start-up signals

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use embassy_sync::signal::Signal;
use heapless::Vec;

use crate::ble::events::{AttHandle, BleEvent, ConnHandle, EventSink, EventSource, UartHandles};
use crate::ble::traits::{BleError, BleStack};
use crate::config::ble::{MAX_ADV_DATA_LEN, MAX_PACKET_SIZE};
use crate::config::channels::{COMMAND_CHANNEL_SIZE, EVENT_CHANNEL_SIZE};

/// Request from the application to the radio task
#[derive(Debug, Clone)]
pub enum RadioCommand {
    /// Start connectable advertising
    Advertise {
        interval_us: u32,
        adv_data: Vec<u8, MAX_ADV_DATA_LEN>,
    },
    /// Notify a characteristic value to one central
    Notify {
        conn: ConnHandle,
        handle: AttHandle,
        data: Vec<u8, MAX_PACKET_SIZE>,
    },
}

/// Events from the radio task
pub static BLE_EVENT_CHANNEL: Channel<CriticalSectionRawMutex, BleEvent, EVENT_CHANNEL_SIZE> =
    Channel::new();

/// Commands to the radio task
pub static RADIO_COMMAND_CHANNEL: Channel<
    CriticalSectionRawMutex,
    RadioCommand,
    COMMAND_CHANNEL_SIZE,
> = Channel::new();

/// Raised once the BLE host is built
pub static RADIO_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Result of GATT server creation
pub static SERVICE_HANDLES: Signal<CriticalSectionRawMutex, Result<UartHandles, BleError>> =
    Signal::new();

/// Type alias for the event channel receiver
pub type EventReceiver = Receiver<'static, CriticalSectionRawMutex, BleEvent, EVENT_CHANNEL_SIZE>;

/// Type alias for the command channel receiver
pub type CommandReceiver =
    Receiver<'static, CriticalSectionRawMutex, RadioCommand, COMMAND_CHANNEL_SIZE>;

impl EventSource for EventReceiver {
    fn try_next(&mut self) -> Option<BleEvent> {
        self.try_receive().ok()
    }
}

/// Type alias for the event channel sender
pub type EventSender = Sender<'static, CriticalSectionRawMutex, BleEvent, EVENT_CHANNEL_SIZE>;

impl EventSink for EventSender {
    fn try_push(&mut self, event: BleEvent) -> Result<(), BleEvent> {
        self.try_send(event).map_err(|TrySendError::Full(event)| event)
    }
}

/// [`BleStack`] backed by the radio task
///
/// Advertise and notify are queued to the radio task; their outcome comes
/// back as [`BleEvent::Fault`] if they fail.
pub struct RadioLink;

impl RadioLink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RadioLink {
    fn default() -> Self {
        Self::new()
    }
}

impl BleStack for RadioLink {
    async fn activate(&mut self) -> Result<(), BleError> {
        RADIO_READY.wait().await;
        Ok(())
    }

    async fn register_uart_service(&mut self) -> Result<UartHandles, BleError> {
        SERVICE_HANDLES.wait().await
    }

    async fn advertise(&mut self, interval_us: u32, adv_data: &[u8]) -> Result<(), BleError> {
        let adv_data = Vec::from_slice(adv_data).map_err(|_| BleError::PayloadTooLarge)?;
        RADIO_COMMAND_CHANNEL
            .send(RadioCommand::Advertise {
                interval_us,
                adv_data,
            })
            .await;
        Ok(())
    }

    async fn notify(
        &mut self,
        conn: ConnHandle,
        handle: AttHandle,
        data: &[u8],
    ) -> Result<(), BleError> {
        let data = Vec::from_slice(data).map_err(|_| BleError::PayloadTooLarge)?;
        RADIO_COMMAND_CHANNEL
            .send(RadioCommand::Notify { conn, handle, data })
            .await;
        Ok(())
    }
}

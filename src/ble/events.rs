//! Typed BLE events and handles
//!
//! The radio side never calls into the peripheral directly. It enqueues
//! [`BleEvent`]s which the application task drains and applies, so the
//! connection set has a single writer.

use core::fmt;

use heapless::Vec;

use crate::ble::traits::BleError;
use crate::config::ble::MAX_PACKET_SIZE;

/// Connection handle issued by the BLE stack for one open link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnHandle(pub u16);

impl fmt::Display for ConnHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attribute (characteristic value) handle in the GATT table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttHandle(pub u16);

/// Characteristic value handles of the registered UART service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartHandles {
    /// Peripheral to central (read, notify)
    pub tx: AttHandle,
    /// Central to peripheral (write, write without response)
    pub rx: AttHandle,
}

/// Bytes written by a central in one GATT write
pub type WriteData = Vec<u8, MAX_PACKET_SIZE>;

/// Event reported by the radio stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BleEvent {
    /// A central opened a link
    Connect { handle: ConnHandle },
    /// A link was closed
    Disconnect { handle: ConnHandle },
    /// A central wrote to a characteristic
    Write {
        conn_handle: ConnHandle,
        value_handle: AttHandle,
        data: WriteData,
    },
    /// The radio task failed an operation it was asked to perform
    Fault { error: BleError },
}

/// Non-blocking source of pending [`BleEvent`]s
pub trait EventSource {
    /// Take the next pending event, if any
    fn try_next(&mut self) -> Option<BleEvent>;
}

/// Non-blocking sink the radio side pushes [`BleEvent`]s into
pub trait EventSink {
    /// Queue `event`, handing it back if there is no room
    fn try_push(&mut self, event: BleEvent) -> Result<(), BleEvent>;
}

/// Queue an RX write without waiting for room.
///
/// Data beyond [`MAX_PACKET_SIZE`] is cut off. Returns false if the queue
/// was full and the write was dropped.
pub fn forward_write<Q: EventSink>(
    queue: &mut Q,
    conn_handle: ConnHandle,
    value_handle: AttHandle,
    data: &[u8],
) -> bool {
    let len = data.len().min(MAX_PACKET_SIZE);
    if len < data.len() {
        log::warn!("Truncating {} byte write from {}", data.len(), conn_handle);
    }
    let data = WriteData::from_slice(&data[..len]).unwrap_or_default();

    let event = BleEvent::Write {
        conn_handle,
        value_handle,
        data,
    };
    match queue.try_push(event) {
        Ok(()) => true,
        Err(_) => {
            log::warn!("Event queue full, dropping write from {}", conn_handle);
            false
        }
    }
}

#[cfg(test)]
impl<const N: usize> EventSource for heapless::Deque<BleEvent, N> {
    fn try_next(&mut self) -> Option<BleEvent> {
        self.pop_front()
    }
}

#[cfg(test)]
impl<const N: usize> EventSink for heapless::Deque<BleEvent, N> {
    fn try_push(&mut self, event: BleEvent) -> Result<(), BleEvent> {
        self.push_back(event)
    }
}

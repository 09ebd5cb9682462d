//! UART service definition
//!
//! Uses the Nordic UART Service layout so standard terminal apps recognise it.
//! - Service UUID: 6E400001-B5A3-F393-E0A9-E50E24DCCA9E
//! - RX Characteristic: 6E400002-... (write, write without response)
//! - TX Characteristic: 6E400003-... (read, notify)

use heapless::Vec;
use trouble_host::prelude::*;

use crate::config::ble::MAX_PACKET_SIZE;

/// Characteristic value buffer
pub type UartValue = Vec<u8, MAX_PACKET_SIZE>;

/// UART service
#[gatt_service(uuid = "6e400001-b5a3-f393-e0a9-e50e24dcca9e")]
pub struct UartService {
    /// TX Characteristic - server notifies button tags here
    #[characteristic(uuid = "6e400003-b5a3-f393-e0a9-e50e24dcca9e", read, notify)]
    pub tx: UartValue,

    /// RX Characteristic - client writes here
    #[characteristic(uuid = "6e400002-b5a3-f393-e0a9-e50e24dcca9e", write, write_without_response)]
    pub rx: UartValue,
}

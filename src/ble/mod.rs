//! Bluetooth Low Energy module
//!
//! Provides a UART-style GATT peripheral: one service with a TX
//! characteristic the device notifies on and an RX characteristic
//! centrals write to.

pub mod advertising;
pub mod events;
pub mod peripheral;
pub mod traits;

// trouble-host bindings, only available with the embedded feature
#[cfg(feature = "embedded")]
pub mod radio;
#[cfg(feature = "embedded")]
pub mod service;

pub use advertising::AdvertisingPayload;
pub use events::{
    forward_write, AttHandle, BleEvent, ConnHandle, EventSink, EventSource, UartHandles, WriteData,
};
pub use peripheral::BlePeripheral;
pub use traits::{BleError, BleStack};

//! BLE stack trait for abstraction and testability
//!
//! This trait defines the operations the peripheral needs from the
//! underlying radio stack, allowing the real trouble-host bridge to be
//! swapped with a mock for testing.

use core::future::Future;

use crate::ble::events::{AttHandle, ConnHandle, UartHandles};

/// Errors that can occur during BLE stack operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleError {
    /// Radio could not be brought up
    ActivationFailed,
    /// GATT service registration failed
    RegistrationFailed,
    /// Advertising could not be started
    AdvertiseFailed,
    /// Notification could not be queued
    NotifyFailed,
    /// Disconnect reported for a handle that is not open
    UnknownConnection(ConnHandle),
    /// Connection table is full
    TooManyConnections,
    /// Data does not fit in the advertising or packet buffer
    PayloadTooLarge,
}

/// Abstract BLE stack interface
///
/// Failures are returned unchanged to the caller; implementations do not
/// retry.
pub trait BleStack {
    /// Power up the radio
    fn activate(&mut self) -> impl Future<Output = Result<(), BleError>>;

    /// Register the UART service and return its characteristic handles
    fn register_uart_service(&mut self) -> impl Future<Output = Result<UartHandles, BleError>>;

    /// Start connectable advertising with the given raw advertising data
    fn advertise(
        &mut self,
        interval_us: u32,
        adv_data: &[u8],
    ) -> impl Future<Output = Result<(), BleError>>;

    /// Notify `data` on characteristic `handle` to the central on `conn`
    fn notify(
        &mut self,
        conn: ConnHandle,
        handle: AttHandle,
        data: &[u8],
    ) -> impl Future<Output = Result<(), BleError>>;
}

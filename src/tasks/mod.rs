//! Embassy tasks module
//!
//! Contains the async radio task that runs alongside the application loop.

pub mod ble;

pub use ble::ble_task;

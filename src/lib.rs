#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app;
pub mod ble;
pub mod config;
pub mod input;
pub mod led;

// Radio task depends on trouble-host/embassy, only available with embedded feature
#[cfg(feature = "embedded")]
pub mod tasks;

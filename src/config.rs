//! Hardware and protocol configuration constants for the ESP32-S3 button board

/// Push-buttons (inputs with internal pull-up, buttons short to ground).
/// The GPIO wiring lives in `main.rs`.
pub mod buttons {
    /// Number of polled buttons
    pub const COUNT: usize = 4;
}

/// BLE peripheral configuration
pub mod ble {
    /// Advertised complete local name
    pub const DEVICE_NAME: &str = "mpy-uart";

    /// Advertising interval in microseconds
    pub const ADV_INTERVAL_US: u32 = 500_000;

    /// Maximum simultaneous central connections tracked by the peripheral.
    /// Must be a power of two (index set capacity).
    pub const MAX_CONNECTIONS: usize = 4;

    /// Legacy advertising data limit in bytes
    pub const MAX_ADV_DATA_LEN: usize = 31;

    /// Largest value accepted on RX or sent on TX in one operation
    pub const MAX_PACKET_SIZE: usize = 128;

    /// UART service (Nordic UART Service layout)
    pub const UART_SERVICE_UUID: u128 = 0x6e400001_b5a3_f393_e0a9_e50e24dcca9e;
}

/// Main loop timing
pub mod timing {
    /// Number of LED toggles in the startup animation
    pub const STARTUP_BLINK_CYCLES: u32 = 50;

    /// Delay between startup animation toggles
    pub const STARTUP_BLINK_MS: u32 = 25;

    /// Delay between button poll iterations
    pub const POLL_PERIOD_MS: u32 = 100;
}

/// Channel sizing between the radio task and the application task
pub mod channels {
    pub const EVENT_CHANNEL_SIZE: usize = 8;
    pub const COMMAND_CHANNEL_SIZE: usize = 8;
}

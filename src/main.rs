#![no_std]
#![no_main]

extern crate alloc;

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"),  // version
    env!("CARGO_PKG_NAME"),     // project_name
    "00:00:00",                 // build_time
    "2025-01-01",               // build_date
    "0.0.0",                    // idf_ver (not using IDF)
    0x10000,                    // mmu_page_size (64KB)
    0,                          // min_efuse_blk_rev_full (accept all)
    u16::MAX                    // max_efuse_blk_rev_full (accept all)
);

use embassy_executor::Spawner;
use esp_backtrace as _;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::timer::timg::TimerGroup;
use static_cell::StaticCell;

use ble_uart_buttons::app::{ButtonBinding, DemoApp};
use ble_uart_buttons::ble::radio::{RadioLink, BLE_EVENT_CHANNEL};
use ble_uart_buttons::ble::BlePeripheral;
use ble_uart_buttons::config;
use ble_uart_buttons::input::{Button, ButtonId};
use ble_uart_buttons::led::StatusLed;

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

/// Static cell for esp-radio controller (needed for 'static lifetime)
static RADIO_CONTROLLER: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

/// Type alias for the BLE controller
type BleController = trouble_host::prelude::ExternalController<
    esp_radio::ble::controller::BleConnector<'static>,
    10,
>;

/// Button pins, in poll order
type ButtonPins = [Input<'static>; config::buttons::COUNT];

#[esp_hal::main]
fn main() -> ! {
    // Initialise heap allocator for BLE support (64KB - BLE requires significant heap)
    esp_alloc::heap_allocator!(size: 64 * 1024);

    esp_println::logger::init_logger(log::LevelFilter::Info);

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Status LED on GPIO48, off until the startup animation runs
    let led = Output::new(peripherals.GPIO48, Level::Low, OutputConfig::default());

    // B1..B4 on GPIO12/15/19/16. Buttons short to ground, so the inputs
    // are pulled up.
    let pull_up = || InputConfig::default().with_pull(Pull::Up);
    let buttons: ButtonPins = [
        Input::new(peripherals.GPIO12, pull_up()),
        Input::new(peripherals.GPIO15, pull_up()),
        Input::new(peripherals.GPIO19, pull_up()),
        Input::new(peripherals.GPIO16, pull_up()),
    ];

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Random static address derived from the eFuse MAC
    let mac = esp_hal::efuse::Efuse::read_base_mac_address();
    let address: [u8; 6] = [mac[3], mac[4], mac[5], 0x1E, 0x83, 0xE7];

    // Initialise esp-radio for BLE support (must be after esp_rtos::start)
    let radio_controller = RADIO_CONTROLLER.init(
        esp_radio::init().expect("Failed to initialize esp-radio")
    );

    // Create BLE connector (ownership is passed to ExternalController)
    let ble_connector = esp_radio::ble::controller::BleConnector::new(
        radio_controller,
        peripherals.BT,
        esp_radio::ble::Config::default(),
    ).expect("Failed to initialize BLE connector");

    // Wrap in ExternalController for trouble-host compatibility
    let controller: BleController = trouble_host::prelude::ExternalController::new(ble_connector);

    // Create and run the embassy executor
    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(async_main(spawner, controller, address, led, buttons));
    })
}

#[embassy_executor::task]
async fn async_main(
    spawner: Spawner,
    ble_controller: BleController,
    address: [u8; 6],
    led: Output<'static>,
    buttons: ButtonPins,
) {
    spawner.spawn(ble_host_task(ble_controller, address)).unwrap();
    spawner.spawn(app_task(led, buttons)).unwrap();
}

/// Task that runs the trouble-host stack
#[embassy_executor::task]
async fn ble_host_task(controller: BleController, address: [u8; 6]) {
    ble_uart_buttons::tasks::ble_task(controller, address).await;
}

/// Task that owns the peripheral, buttons and LED
///
/// Any BLE stack error ends in a panic, which resets the device.
#[embassy_executor::task]
async fn app_task(led: Output<'static>, buttons: ButtonPins) {
    let started = BlePeripheral::new(RadioLink::new(), config::ble::DEVICE_NAME).await;
    let mut peripheral = match started {
        Ok(p) => p,
        Err(e) => panic!("BLE peripheral start failed: {:?}", e),
    };

    peripheral.on_write(|value| log::info!("RX {:?}", value));

    let [b1, b2, b3, b4] = buttons;
    let bindings = [
        ButtonBinding::new(ButtonId::B1, Button::new(b1)),
        ButtonBinding::new(ButtonId::B2, Button::new(b2)),
        ButtonBinding::new(ButtonId::B3, Button::new(b3)),
        ButtonBinding::new(ButtonId::B4, Button::new(b4)),
    ];

    let mut app = DemoApp::new(peripheral, bindings, StatusLed::new(led));
    let mut delay = embassy_time::Delay;

    app.startup_animation(&mut delay).await;

    let mut events = BLE_EVENT_CHANNEL.receiver();
    let Err(e) = app.run(&mut events, &mut delay).await;
    panic!("BLE stack fault: {:?}", e);
}

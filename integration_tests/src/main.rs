//! Integration tests for the BLE UART button firmware.
//!
//! Run after flashing the firmware. Connects to the board over BLE, checks
//! the UART service and, with `--interactive`, asks the operator to press
//! each button.

mod ble_client;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use ble_client::BleClient;
use tests::{print_results, run_automatic_tests, run_button_tests, run_reconnect_test};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Integration tests for the BLE UART button firmware")]
struct Args {
    /// BLE device name to scan for
    #[arg(long, default_value = "mpy-uart")]
    ble_name: String,

    /// BLE scan timeout in seconds
    #[arg(long, default_value = "10")]
    scan_timeout: u64,

    /// Ask the operator to press the buttons
    #[arg(short, long)]
    interactive: bool,

    /// Seconds to wait for each button press
    #[arg(long, default_value = "15")]
    press_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let scan_timeout = Duration::from_secs(args.scan_timeout);

    println!("{}", "BLE UART Button Integration Tests".bold());
    println!("Device: \"{}\"", args.ble_name);
    println!();

    println!("Scanning for BLE device \"{}\"...", args.ble_name);
    let client = BleClient::connect_by_name(&args.ble_name, scan_timeout).await?;
    println!("{}", "  BLE connected!".green());

    // Let the startup animation and first poll cycles pass
    tokio::time::sleep(Duration::from_millis(500)).await;
    client.clear_buffer().await;

    println!("\n{}", "Running tests...".bold());
    println!();

    let mut results = run_automatic_tests(&client).await;

    if args.interactive {
        let press_timeout = Duration::from_secs(args.press_timeout);
        results.extend(run_button_tests(&client, press_timeout).await);
    }

    let (result, client) = run_reconnect_test(client, &args.ble_name, scan_timeout).await;
    results.push(result);

    if let Some(client) = client {
        let _ = client.disconnect().await;
    }

    print_results(&results);

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

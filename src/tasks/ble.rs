//! BLE radio task
//!
//! Runs the trouble-host stack and bridges it to the application task:
//! GAP and GATT activity becomes [`BleEvent`]s, and [`RadioCommand`]s from
//! the application become advertising and notifications.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::Vec;
use trouble_host::prelude::*;

use crate::ble::events::{forward_write, AttHandle, BleEvent, ConnHandle, UartHandles};
use crate::ble::radio::{
    CommandReceiver, RadioCommand, BLE_EVENT_CHANNEL, RADIO_COMMAND_CHANNEL, RADIO_READY,
    SERVICE_HANDLES,
};
use crate::ble::service::UartService;
use crate::ble::traits::BleError;
use crate::config::ble::{DEVICE_NAME, MAX_ADV_DATA_LEN};

/// Number of maximum concurrent connections the controller accepts
///
/// Advertising stops once a central connects and restarts on disconnect,
/// so the radio serves one link at a time.
const CONNECTIONS_MAX: usize = 1;
/// Number of L2CAP channels
const L2CAP_CHANNELS_MAX: usize = 3;

/// BLE GATT Server with the UART service
#[gatt_server(mutex_type = CriticalSectionRawMutex)]
struct Server {
    uart: UartService,
}

/// Main BLE task that manages the Bluetooth stack and connections
///
/// This task:
/// 1. Builds the host and the GATT server, publishing the UART handles
/// 2. Advertises whenever the application asks for it
/// 3. Reports connect, write and disconnect as events
/// 4. Sends notifications queued by the application
pub async fn ble_task<C: Controller>(controller: C, address: [u8; 6]) {
    log::info!("BLE: Starting as '{}'", DEVICE_NAME);

    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();

    let stack =
        trouble_host::new(controller, &mut resources).set_random_address(Address::random(address));

    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    RADIO_READY.signal(());

    let gap = GapConfig::Peripheral(PeripheralConfig {
        name: DEVICE_NAME,
        appearance: &appearance::UNKNOWN,
    });
    let server: Server = match Server::new_with_config(gap) {
        Ok(s) => s,
        Err(e) => {
            log::error!("BLE: GATT server creation failed: {:?}", e);
            SERVICE_HANDLES.signal(Err(BleError::RegistrationFailed));
            return;
        }
    };

    let handles = UartHandles {
        tx: AttHandle(server.uart.tx.handle),
        rx: AttHandle(server.uart.rx.handle),
    };
    SERVICE_HANDLES.signal(Ok(handles));

    let runner_task = runner.run();

    let peripheral_task = async {
        let commands = RADIO_COMMAND_CHANNEL.receiver();
        let mut events = BLE_EVENT_CHANNEL.sender();

        loop {
            let (interval_us, adv_data) = next_advertise_request(&commands).await;

            log::debug!("BLE: Advertising...");
            let interval = embassy_time::Duration::from_micros(interval_us as u64);
            let params = AdvertisementParameters {
                interval_min: interval,
                interval_max: interval,
                ..Default::default()
            };
            let advertiser = match peripheral
                .advertise(
                    &params,
                    Advertisement::ConnectableScannableUndirected {
                        adv_data: &adv_data,
                        scan_data: &[],
                    },
                )
                .await
            {
                Ok(a) => a,
                Err(e) => {
                    log::error!("BLE: Advertising failed: {:?}", e);
                    events.send(BleEvent::Fault { error: BleError::AdvertiseFailed }).await;
                    continue;
                }
            };

            let acceptor = match advertiser.accept().await {
                Ok(a) => a,
                Err(e) => {
                    log::error!("BLE: Accepting connection failed: {:?}", e);
                    events.send(BleEvent::Fault { error: BleError::AdvertiseFailed }).await;
                    continue;
                }
            };

            // Attach to attribute server (using Deref to get &AttributeServer)
            let conn = match acceptor.with_attribute_server(&*server) {
                Ok(c) => c,
                Err(e) => {
                    log::error!("BLE: Attaching GATT server failed: {:?}", e);
                    events.send(BleEvent::Fault { error: BleError::RegistrationFailed }).await;
                    continue;
                }
            };

            let handle = ConnHandle(conn.raw().handle().raw());
            events.send(BleEvent::Connect { handle }).await;

            loop {
                // Commands first so queued notifies drain under a write flood
                match select(commands.receive(), conn.next()).await {
                    Either::Second(GattConnectionEvent::Disconnected { reason: _ }) => {
                        events.send(BleEvent::Disconnect { handle }).await;
                        break;
                    }
                    Either::Second(GattConnectionEvent::Gatt { event }) => match event {
                        GattEvent::Write(write_event) => {
                            let value_handle = AttHandle(write_event.handle());
                            // The app may be blocked on the command queue, so
                            // writes must not wait for event queue room
                            forward_write(&mut events, handle, value_handle, write_event.data());
                            let _ = write_event.accept();
                        }
                        GattEvent::Read(read_event) => {
                            let _ = read_event.accept();
                        }
                        GattEvent::Other(other_event) => {
                            let _ = other_event.accept();
                        }
                    },
                    Either::Second(_) => {}
                    Either::First(RadioCommand::Notify {
                        conn: target,
                        handle: value_handle,
                        data,
                    }) => {
                        if target != handle || value_handle != handles.tx {
                            log::warn!("BLE: Dropping notify for link {}", target);
                            continue;
                        }
                        if let Err(e) = server.uart.tx.notify(&conn, &data).await {
                            log::error!("BLE: Notify failed: {:?}", e);
                            events.send(BleEvent::Fault { error: BleError::NotifyFailed }).await;
                        }
                    }
                    Either::First(RadioCommand::Advertise { .. }) => {
                        log::debug!("BLE: Already connected, ignoring advertise request");
                    }
                }
            }
        }
    };

    select(runner_task, peripheral_task).await;
}

/// Wait for the next advertise request, dropping notifications meant for
/// links that are already closed
async fn next_advertise_request(commands: &CommandReceiver) -> (u32, Vec<u8, MAX_ADV_DATA_LEN>) {
    loop {
        match commands.receive().await {
            RadioCommand::Advertise {
                interval_us,
                adv_data,
            } => return (interval_us, adv_data),
            RadioCommand::Notify { conn, .. } => {
                log::debug!("BLE: No link, dropping notify for {}", conn);
            }
        }
    }
}

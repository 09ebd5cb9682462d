//! Demo application loop
//!
//! Blinks the status LED at start-up, then polls the four buttons at a fixed
//! period. While a central is connected each pressed button notifies its tag
//! and the LED blinks; otherwise the LED is off and nothing is sent.

use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::ble::events::EventSource;
use crate::ble::peripheral::BlePeripheral;
use crate::ble::traits::{BleError, BleStack};
use crate::config::buttons::COUNT as BUTTON_COUNT;
use crate::config::timing;
use crate::input::{Button, ButtonId};
use crate::led::StatusLed;

/// A button together with its identity
pub struct ButtonBinding<P> {
    pub id: ButtonId,
    pub button: Button<P>,
}

impl<P: InputPin> ButtonBinding<P> {
    pub fn new(id: ButtonId, button: Button<P>) -> Self {
        Self { id, button }
    }
}

/// Buttons, status LED and BLE peripheral composed into one polling loop
pub struct DemoApp<S, P, L> {
    peripheral: BlePeripheral<S>,
    buttons: [ButtonBinding<P>; BUTTON_COUNT],
    led: StatusLed<L>,
}

impl<S, P, L> DemoApp<S, P, L>
where
    S: BleStack,
    P: InputPin,
    L: OutputPin,
{
    /// Create the application. Buttons are polled in array order.
    pub fn new(
        peripheral: BlePeripheral<S>,
        buttons: [ButtonBinding<P>; BUTTON_COUNT],
        led: StatusLed<L>,
    ) -> Self {
        Self {
            peripheral,
            buttons,
            led,
        }
    }

    pub fn peripheral(&self) -> &BlePeripheral<S> {
        &self.peripheral
    }

    pub fn peripheral_mut(&mut self) -> &mut BlePeripheral<S> {
        &mut self.peripheral
    }

    /// Toggle the LED a fixed number of times, regardless of connection state
    pub async fn startup_animation<D: DelayNs>(&mut self, delay: &mut D) {
        for _ in 0..timing::STARTUP_BLINK_CYCLES {
            self.led.toggle();
            delay.delay_ms(timing::STARTUP_BLINK_MS).await;
        }
    }

    /// Apply every pending BLE event, returning how many were applied
    pub async fn drain_events<E: EventSource>(
        &mut self,
        events: &mut E,
    ) -> Result<usize, BleError> {
        let mut applied = 0;
        while let Some(event) = events.try_next() {
            self.peripheral.handle_event(event).await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// One poll iteration
    ///
    /// Connected: notify the tag of every pressed button, then toggle the
    /// LED. Not connected: LED off, nothing sent.
    pub async fn cycle(&mut self) -> Result<(), BleError> {
        if !self.peripheral.is_connected() {
            self.led.off();
            return Ok(());
        }

        for binding in self.buttons.iter_mut() {
            let id = binding.id;
            if binding.button.when_pressed(|| log::info!("Button {:?} pressed", id)) {
                self.peripheral.send(id.tag()).await?;
            }
        }
        self.led.toggle();

        Ok(())
    }

    /// Run forever: apply pending events, poll, sleep
    ///
    /// Only returns if the BLE stack reports an error.
    pub async fn run<E, D>(&mut self, events: &mut E, delay: &mut D) -> Result<Infallible, BleError>
    where
        E: EventSource,
        D: DelayNs,
    {
        loop {
            self.drain_events(events).await?;
            self.cycle().await?;
            delay.delay_ms(timing::POLL_PERIOD_MS).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::events::{BleEvent, ConnHandle};
    use crate::ble::traits::mock::{MockBleStack, MOCK_TX_HANDLE};
    use crate::config::ble::DEVICE_NAME;
    use crate::input::button::mock::MockInputPin;
    use crate::led::mock::MockOutputPin;
    use heapless::{Deque, Vec};

    /// Delay that records requested durations instead of sleeping
    struct MockDelay {
        waits_ms: Vec<u32, 64>,
    }

    impl MockDelay {
        fn new() -> Self {
            Self { waits_ms: Vec::new() }
        }
    }

    impl DelayNs for MockDelay {
        async fn delay_ns(&mut self, ns: u32) {
            let _ = self.waits_ms.push(ns / 1_000_000);
        }

        async fn delay_ms(&mut self, ms: u32) {
            let _ = self.waits_ms.push(ms);
        }
    }

    struct Board {
        pins: [MockInputPin; BUTTON_COUNT],
        led: MockOutputPin,
    }

    impl Board {
        /// All buttons released
        fn new() -> Self {
            Self {
                pins: [
                    MockInputPin::fixed(true),
                    MockInputPin::fixed(true),
                    MockInputPin::fixed(true),
                    MockInputPin::fixed(true),
                ],
                led: MockOutputPin::new(),
            }
        }

        fn press(&self, id: ButtonId) {
            self.pins[Self::index(id)].set_level(false);
        }

        fn index(id: ButtonId) -> usize {
            match id {
                ButtonId::B1 => 0,
                ButtonId::B2 => 1,
                ButtonId::B3 => 2,
                ButtonId::B4 => 3,
            }
        }

        fn app(&self) -> TestApp<'_> {
            let peripheral =
                futures::executor::block_on(BlePeripheral::new(MockBleStack::new(), DEVICE_NAME))
                    .unwrap();
            let buttons = [
                ButtonBinding::new(ButtonId::B1, Button::new(&self.pins[0])),
                ButtonBinding::new(ButtonId::B2, Button::new(&self.pins[1])),
                ButtonBinding::new(ButtonId::B3, Button::new(&self.pins[2])),
                ButtonBinding::new(ButtonId::B4, Button::new(&self.pins[3])),
            ];
            DemoApp::new(peripheral, buttons, StatusLed::new(&self.led))
        }
    }

    type TestApp<'a> = DemoApp<MockBleStack, &'a MockInputPin, &'a MockOutputPin>;

    fn sent_tags(app: &TestApp<'_>) -> Vec<Vec<u8, 128>, 64> {
        app.peripheral()
            .stack()
            .notifications()
            .into_iter()
            .map(|(_, _, data)| data)
            .collect()
    }

    fn connect<S: BleStack, P: InputPin, L: OutputPin>(app: &mut DemoApp<S, P, L>, handle: u16) {
        futures::executor::block_on(app.peripheral_mut().handle_event(BleEvent::Connect {
            handle: ConnHandle(handle),
        }))
        .unwrap();
    }

    #[test]
    fn test_startup_animation_blinks_fifty_times() {
        let board = Board::new();
        let mut app = board.app();
        let mut delay = MockDelay::new();

        futures::executor::block_on(app.startup_animation(&mut delay));

        let history = board.led.history();
        assert_eq!(history.len(), 50);
        assert!(history.iter().step_by(2).all(|&on| on));
        assert!(history.iter().skip(1).step_by(2).all(|&on| !on));
        assert_eq!(delay.waits_ms.len(), 50);
        assert!(delay.waits_ms.iter().all(|&ms| ms == 25));
    }

    #[test]
    fn test_disconnected_cycle_turns_led_off_and_sends_nothing() {
        let board = Board::new();
        for id in ButtonId::ALL {
            board.press(id);
        }
        let mut app = board.app();

        futures::executor::block_on(app.cycle()).unwrap();

        assert_eq!(board.led.level(), Some(false));
        assert!(sent_tags(&app).is_empty());
        // Buttons are not even read while disconnected
        assert!(board.pins.iter().all(|pin| pin.reads() == 0));
    }

    #[test]
    fn test_connected_cycle_sends_tag_of_pressed_button() {
        let board = Board::new();
        board.press(ButtonId::B3);
        let mut app = board.app();
        connect(&mut app, 1);

        futures::executor::block_on(app.cycle()).unwrap();

        let notifications = app.peripheral().stack().notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].0, ConnHandle(1));
        assert_eq!(notifications[0].1, MOCK_TX_HANDLE);
        assert_eq!(notifications[0].2.as_slice(), b"B3");
    }

    #[test]
    fn test_held_button_fires_on_consecutive_polls() {
        let board = Board::new();
        board.press(ButtonId::B1);
        let mut app = board.app();
        connect(&mut app, 1);

        futures::executor::block_on(async {
            app.cycle().await.unwrap();
            app.cycle().await.unwrap();
        });

        let tags = sent_tags(&app);
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|tag| tag.as_slice() == b"B1"));
    }

    #[test]
    fn test_all_buttons_in_poll_order() {
        let board = Board::new();
        for id in ButtonId::ALL {
            board.press(id);
        }
        let mut app = board.app();
        connect(&mut app, 1);

        futures::executor::block_on(app.cycle()).unwrap();

        let tags = sent_tags(&app);
        let tags: Vec<&[u8], 4> = tags.iter().map(|t| t.as_slice()).collect();
        assert_eq!(
            tags.as_slice(),
            &[&b"B1"[..], &b"B2"[..], &b"B3"[..], &b"B4"[..]]
        );
    }

    #[test]
    fn test_connected_led_blinks_each_cycle() {
        let board = Board::new();
        let mut app = board.app();
        connect(&mut app, 1);

        futures::executor::block_on(async {
            app.cycle().await.unwrap();
            app.cycle().await.unwrap();
            app.cycle().await.unwrap();
        });

        assert_eq!(board.led.history().as_slice(), &[true, false, true]);
        assert!(sent_tags(&app).is_empty());
    }

    #[test]
    fn test_drain_events_applies_all_pending() {
        let board = Board::new();
        let mut app = board.app();
        let mut events: Deque<BleEvent, 8> = Deque::new();
        events
            .push_back(BleEvent::Connect {
                handle: ConnHandle(1),
            })
            .unwrap();
        events
            .push_back(BleEvent::Connect {
                handle: ConnHandle(2),
            })
            .unwrap();
        events
            .push_back(BleEvent::Disconnect {
                handle: ConnHandle(1),
            })
            .unwrap();

        let applied = futures::executor::block_on(app.drain_events(&mut events)).unwrap();

        assert_eq!(applied, 3);
        assert!(events.is_empty());
        assert_eq!(app.peripheral().connection_count(), 1);
        assert_eq!(app.peripheral().stack().advertise_count(), 2);
    }

    #[test]
    fn test_run_stops_on_stack_fault() {
        let board = Board::new();
        board.press(ButtonId::B2);
        let mut app = board.app();
        let mut delay = MockDelay::new();
        let mut events: Deque<BleEvent, 8> = Deque::new();
        events
            .push_back(BleEvent::Connect {
                handle: ConnHandle(1),
            })
            .unwrap();

        app.peripheral()
            .stack()
            .set_next_notify_error(BleError::NotifyFailed);

        let result = futures::executor::block_on(app.run(&mut events, &mut delay));

        assert_eq!(result.unwrap_err(), BleError::NotifyFailed);
        assert!(delay.waits_ms.is_empty());
    }

    /// Event source yielding one batch per loop iteration
    struct ScriptedEvents {
        batches: Deque<Option<BleEvent>, 16>,
    }

    impl EventSource for ScriptedEvents {
        fn try_next(&mut self) -> Option<BleEvent> {
            // `None` entries end the current drain
            self.batches.pop_front().flatten()
        }
    }

    #[test]
    fn test_run_polls_at_fixed_period_until_fault() {
        let board = Board::new();
        let mut app = board.app();
        let mut delay = MockDelay::new();
        let mut events = ScriptedEvents {
            batches: Deque::new(),
        };
        for entry in [
            Some(BleEvent::Connect {
                handle: ConnHandle(1),
            }),
            None,
            None,
            Some(BleEvent::Fault {
                error: BleError::AdvertiseFailed,
            }),
        ] {
            events.batches.push_back(entry).unwrap();
        }

        let result = futures::executor::block_on(app.run(&mut events, &mut delay));

        assert_eq!(result.unwrap_err(), BleError::AdvertiseFailed);
        assert_eq!(delay.waits_ms.as_slice(), &[100, 100]);
        // Connected for two cycles: LED blinked twice
        assert_eq!(board.led.history().as_slice(), &[true, false]);
    }
}

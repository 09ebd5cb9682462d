//! Status LED control
//!
//! The LED blinks during start-up, blinks once per poll while a central is
//! connected and stays dark otherwise.

use embedded_hal::digital::OutputPin;

/// Status LED with a remembered blink phase
///
/// The phase is the level the next [`StatusLed::toggle`] writes. Turning
/// the LED off does not reset it, so blinking resumes where it stopped.
pub struct StatusLed<L> {
    pin: L,
    next_on: bool,
}

impl<L: OutputPin> StatusLed<L> {
    /// Wrap an output pin. The first toggle turns the LED on.
    pub fn new(pin: L) -> Self {
        Self { pin, next_on: true }
    }

    /// Drive the LED to the given state
    pub fn set(&mut self, on: bool) {
        // GPIO writes on this board cannot fail
        let _ = if on { self.pin.set_high() } else { self.pin.set_low() };
    }

    /// Write the current phase and flip it
    pub fn toggle(&mut self) {
        let on = self.next_on;
        self.set(on);
        self.next_on = !on;
    }

    /// Turn the LED off without touching the blink phase
    pub fn off(&mut self) {
        self.set(false);
    }

    /// Level the next toggle will write
    pub fn next_phase(&self) -> bool {
        self.next_on
    }
}

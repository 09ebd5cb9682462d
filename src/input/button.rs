//! Level-polled push-button
//!
//! A button is a GPIO input read fresh on every call. There is no cached
//! previous level, so a held button reports "pressed" on every poll.

use embedded_hal::digital::InputPin;

/// Electrical level that counts as "pressed"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Pressed reads low. Pull-up input with the button shorting to ground.
    ActiveLow,
    /// Pressed reads high. Pull-down input with the button tied to VCC.
    ActiveHigh,
}

/// Identity of each button on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    B1,
    B2,
    B3,
    B4,
}

impl ButtonId {
    /// All buttons in poll order
    pub const ALL: [ButtonId; 4] = [ButtonId::B1, ButtonId::B2, ButtonId::B3, ButtonId::B4];

    /// ASCII tag notified to connected centrals when this button is pressed
    pub fn tag(self) -> &'static [u8; 2] {
        match self {
            ButtonId::B1 => b"B1",
            ButtonId::B2 => b"B2",
            ButtonId::B3 => b"B3",
            ButtonId::B4 => b"B4",
        }
    }
}

/// A single push-button on a GPIO input
///
/// The pin must already be configured as an input with the pull matching
/// the polarity (pull-up for [`Polarity::ActiveLow`]).
pub struct Button<P> {
    pin: P,
    polarity: Polarity,
}

impl<P: InputPin> Button<P> {
    /// Create an active-low button on a pulled-up input
    pub fn new(pin: P) -> Self {
        Self::with_polarity(pin, Polarity::ActiveLow)
    }

    /// Create a button with an explicit polarity
    pub fn with_polarity(pin: P, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }

    /// Returns the configured polarity
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Returns true if the button is pressed right now.
    ///
    /// A failed pin read counts as not pressed.
    pub fn is_pressed(&mut self) -> bool {
        let level = match self.polarity {
            Polarity::ActiveLow => self.pin.is_low(),
            Polarity::ActiveHigh => self.pin.is_high(),
        };
        let pressed = level.unwrap_or(false);

        if pressed {
            log::trace!("Button is pressed");
        } else {
            log::trace!("Button is not pressed");
        }
        pressed
    }

    /// Invoke `on_pressed` if the button is pressed right now.
    ///
    /// The callback runs synchronously on the caller's context. Returns
    /// whether the button was pressed.
    pub fn when_pressed<F: FnOnce()>(&mut self, on_pressed: F) -> bool {
        let pressed = self.is_pressed();
        if pressed {
            on_pressed();
        }
        pressed
    }
}

#[cfg(test)]
pub mod mock {
    //! Mock input pin for testing

    use core::cell::RefCell;
    use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};
    use heapless::Deque;

    /// Input pin returning scripted levels
    ///
    /// Levels are consumed in order; once the script is exhausted the pin
    /// keeps reading the last level. `None` entries simulate read errors.
    pub struct MockInputPin {
        script: RefCell<Deque<Option<bool>, 16>>,
        last: RefCell<Option<bool>>,
        reads: RefCell<usize>,
    }

    impl MockInputPin {
        /// Pin that always reads the given level (true = high)
        pub fn fixed(high: bool) -> Self {
            Self {
                script: RefCell::new(Deque::new()),
                last: RefCell::new(Some(high)),
                reads: RefCell::new(0),
            }
        }

        /// Pin that reads the given levels in order
        pub fn scripted(levels: &[Option<bool>]) -> Self {
            let pin = Self::fixed(true);
            for &level in levels {
                let _ = pin.script.borrow_mut().push_back(level);
            }
            pin
        }

        /// Change the level returned once the script is exhausted
        pub fn set_level(&self, high: bool) {
            *self.last.borrow_mut() = Some(high);
        }

        /// Number of level reads performed
        pub fn reads(&self) -> usize {
            *self.reads.borrow()
        }

        fn next_level(&self) -> Option<bool> {
            *self.reads.borrow_mut() += 1;
            match self.script.borrow_mut().pop_front() {
                Some(level) => {
                    if level.is_some() {
                        *self.last.borrow_mut() = level;
                    }
                    level
                }
                None => *self.last.borrow(),
            }
        }
    }

    impl ErrorType for MockInputPin {
        type Error = ErrorKind;
    }

    impl InputPin for MockInputPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            self.next_level().ok_or(ErrorKind::Other)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            self.next_level().map(|high| !high).ok_or(ErrorKind::Other)
        }
    }

    impl InputPin for &MockInputPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            self.next_level().ok_or(ErrorKind::Other)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            self.next_level().map(|high| !high).ok_or(ErrorKind::Other)
        }
    }
}

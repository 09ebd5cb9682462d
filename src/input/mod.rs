//! Push-button inputs
//!
//! Level-polled buttons with no debounce and no edge memory, plus the
//! identity of each button on the board.

pub mod button;

pub use button::{Button, ButtonId, Polarity};

//! Physical input: GPIO pin backends and the edge-monitoring loop

mod monitor;
mod pin;

pub use monitor::{clamp_debounce, PinMonitor, TriggerCallback, DEFAULT_DEBOUNCE, MIN_DEBOUNCE};
pub use pin::{select_pin_reader, PinReader, SimulatedPin};

#[cfg(feature = "rpi")]
pub use pin::HardwarePin;

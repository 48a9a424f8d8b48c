//! Pin reader backends
//!
//! The monitor is polymorphic over [`PinReader`]: a real GPIO-backed reader
//! on Raspberry Pi hardware, and a simulated reader that always reports LOW
//! wherever the hardware interface is unavailable. The backend is chosen once
//! at construction; nothing re-checks availability per call.

use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

/// A binary input line sampled by the monitor
pub trait PinReader: Send + Sync {
    /// Current logical level (true = HIGH)
    fn read(&self) -> Result<bool>;

    /// Human-readable backend description for logs and status
    fn describe(&self) -> String;

    /// True for the no-op backend used when hardware is absent
    fn is_simulated(&self) -> bool {
        false
    }
}

/// No-op backend: always reports LOW
///
/// Used on non-Pi hosts and whenever the GPIO character device cannot be
/// opened. Capability absence, not an error.
pub struct SimulatedPin {
    pin: u8,
}

impl SimulatedPin {
    pub fn new(pin: u8) -> Self {
        Self { pin }
    }
}

impl PinReader for SimulatedPin {
    fn read(&self) -> Result<bool> {
        Ok(false)
    }

    fn describe(&self) -> String {
        format!("simulated pin {}", self.pin)
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

/// Real GPIO input configured with an internal pull-down, matching a button
/// wired between the pin and 3V3
#[cfg(feature = "rpi")]
pub struct HardwarePin {
    pin: rppal::gpio::InputPin,
    number: u8,
}

#[cfg(feature = "rpi")]
impl HardwarePin {
    pub fn new(pin_number: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new()?;
        let pin = gpio.get(pin_number)?.into_input_pulldown();
        Ok(Self {
            pin,
            number: pin_number,
        })
    }
}

#[cfg(feature = "rpi")]
impl PinReader for HardwarePin {
    fn read(&self) -> Result<bool> {
        Ok(self.pin.is_high())
    }

    fn describe(&self) -> String {
        format!("GPIO pin {}", self.number)
    }
}

/// Pick the pin backend for this host
///
/// Tries the hardware backend when compiled in and falls back to the
/// simulated one, logging the downgrade.
pub fn select_pin_reader(pin: u8) -> Arc<dyn PinReader> {
    #[cfg(feature = "rpi")]
    {
        match HardwarePin::new(pin) {
            Ok(reader) => {
                tracing::info!("GPIO pin {} configured as input (pull-down)", pin);
                return Arc::new(reader);
            }
            Err(e) => {
                warn!("GPIO unavailable ({}), falling back to simulated pin", e);
            }
        }
    }
    #[cfg(not(feature = "rpi"))]
    warn!("Built without the rpi feature - GPIO monitoring is simulated");

    Arc::new(SimulatedPin::new(pin))
}

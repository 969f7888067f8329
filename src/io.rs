//! Digital I/O capability
//!
//! Pin direction, pull and level control at the vendor SDK boundary. The
//! timer subsystem does not use this itself; it is here for the callers that
//! do (status LEDs, strobe outputs).

use core::convert::Infallible;

use embedded_hal::digital::v2::{OutputPin, PinState};

use crate::utils::InfallibleResult;

/// Board pin number
pub type Pin = u8;

/// Direction and pull configuration of a pin
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "mock"), derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    Disabled,
    Output,
    Input,
    InputPullUp,
}

/// Logic level on a pin
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "mock"), derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<Level> for PinState {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => PinState::Low,
            Level::High => PinState::High,
        }
    }
}

impl From<PinState> for Level {
    fn from(state: PinState) -> Self {
        match state {
            PinState::Low => Level::Low,
            PinState::High => Level::High,
        }
    }
}

/// Pin control at the SDK boundary, one implementation per target platform
pub trait DigitalIo {
    /// Configure direction and pull for a pin
    ///
    /// The pull-up is engaged only in [`PinMode::InputPullUp`]; every other
    /// mode disables it.
    fn set_pin_mode(&mut self, pin: Pin, mode: PinMode);

    /// Drive an output pin to a logic level
    fn write_pin(&mut self, pin: Pin, level: Level);
}

/// Drive any infallible HAL output pin to a level
pub fn write_level(pin: &mut impl OutputPin<Error = Infallible>, level: Level) {
    match level {
        Level::Low => pin.set_low().infallible(),
        Level::High => pin.set_high().infallible(),
    }
}

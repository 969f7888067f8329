//! Frequency resolution
//!
//! A requested frequency has to be expressed as `clock / (prescaler * ticks)`
//! with a 16-bit prescaler and a 64-bit tick counter. The search below
//! shifts as much of the divisor as possible out of the tick counter and
//! into the prescaler, and reports whether the result hits the request
//! exactly or had to be rounded.

use crate::board::FREQ_MAX;

use super::{Freq, Prescaler, Ticks};

/// Greatest value the 16-bit prescaler register accepts
pub const PRESCALER_MAX: Prescaler = Prescaler::MAX;

/// Whether a resolved frequency matches the request
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "mock"), derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Precision {
    /// The request divides the reference clock evenly
    Exact,
    /// The request was snapped to the closest value the divider chain reaches
    Approximate,
}

/// Hardware divider values for a frequency request
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "mock"), derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Resolved {
    /// Frequency the hardware will actually produce
    ///
    /// Authoritative: callers must use this in place of their request.
    pub freq: Freq,
    pub prescaler: Prescaler,
    pub ticks: Ticks,
    pub precision: Precision,
}

impl Resolved {
    /// Break a frequency request into prescaler and tick values
    ///
    /// Returns `None` for zero or for anything above [`FREQ_MAX`]; those are
    /// caller errors, not candidates for clamping.
    pub fn compute(clock_hz: u32, freq: Freq) -> Option<Self> {
        if freq == 0 || freq > FREQ_MAX {
            return None;
        }

        let precision = if clock_hz % freq != 0 {
            Precision::Approximate
        } else {
            Precision::Exact
        };

        // prescaler * ticks == clock / freq
        let target = clock_hz / freq;

        let (prescaler, ticks) = if target <= PRESCALER_MAX as u32 {
            (target as Prescaler, 1)
        } else {
            // Greedily move powers of two from the tick count into the
            // prescaler while both stay in range. Large odd factors are left
            // in the tick counter; the 64-bit counter absorbs them.
            let mut prescaler: u32 = 1;
            let mut ticks = target as Ticks;
            while ticks % 2 == 0 && prescaler * 2 <= PRESCALER_MAX as u32 {
                ticks /= 2;
                prescaler *= 2;
            }
            (prescaler as Prescaler, ticks)
        };

        let freq = (clock_hz as u64 / (prescaler as u64 * ticks)) as Freq;

        Some(Resolved { freq, prescaler, ticks, precision })
    }
}

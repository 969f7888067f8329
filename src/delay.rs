//! Delay capability
//!
//! Blocking millisecond/microsecond delays at the SDK boundary. Millisecond
//! delays yield to the scheduler on the real target; microsecond delays
//! busy-wait.

use embedded_hal::blocking::delay::{DelayMs, DelayUs};

/// Blocking delays, one implementation per target platform
pub trait DelayDriver {
    /// Block the calling task for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Busy-wait for `us` microseconds
    fn delay_us(&mut self, us: u32);
}

/// Adapter exposing a [`DelayDriver`] through the embedded-hal delay traits
pub struct Delay<D>(pub D);

impl<D: DelayDriver> DelayMs<u32> for Delay<D> {
    fn delay_ms(&mut self, ms: u32) {
        self.0.delay_ms(ms);
    }
}

impl<D: DelayDriver> DelayUs<u32> for Delay<D> {
    fn delay_us(&mut self, us: u32) {
        self.0.delay_us(us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDelay;

    #[test]
    fn adapter_forwards_to_the_driver() {
        let mut delay = Delay(MockDelay::new());
        DelayMs::delay_ms(&mut delay, 2);
        DelayUs::delay_us(&mut delay, 500);
        assert_eq!(delay.0.elapsed_us(), 2_500);
    }
}

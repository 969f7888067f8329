use super::{Prescaler, Priority, Ticks};

/// Fixed physical binding of one timer slot
///
/// The chip exposes its timers as two groups of two; which slot maps to which
/// (group, index) pair is decided at compile time in [`crate::board`].
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "mock"), derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerBank {
    pub group: u8,
    pub index: u8,
}

/// Opaque parameter handed to an alarm callback
///
/// The hardware layer passes no user data into the interrupt; the context
/// only exists so the callback can produce an [`AlarmAck`].
pub struct AlarmContext {
    _empty: (),
}

/// Proof that an alarm callback acknowledged its interrupt
///
/// Can only be produced by consuming an [`AlarmContext`], so a callback
/// cannot return without signalling completion to the hardware layer.
pub struct AlarmAck {
    yield_requested: bool,
}

impl AlarmContext {
    /// Contexts are created by the driver when the alarm fires
    pub const fn new() -> Self {
        Self { _empty: () }
    }

    /// Acknowledge the interrupt
    ///
    /// `yield_requested` reports whether the callback woke a higher priority
    /// task, which the interrupt epilogue passes back to the scheduler.
    pub fn complete(self, yield_requested: bool) -> AlarmAck {
        AlarmAck { yield_requested }
    }
}

impl AlarmAck {
    pub fn yield_requested(&self) -> bool {
        self.yield_requested
    }
}

/// Periodic alarm callback, runs in interrupt context
pub type AlarmCallback = fn(AlarmContext) -> AlarmAck;

/// Map a priority ordinal onto one of the discrete interrupt level flags
///
/// Ordinals collapse onto four levels; the mapping is monotonic, with most
/// of the input range landing on the lowest levels.
pub fn intr_flags(priority: Priority) -> u32 {
    1 << (priority / (Priority::MAX / 3))
}

/// Register-level operations on one timer bank
///
/// One implementation per target platform. [`super::TimerPool`] sequences
/// these calls and never touches registers itself. All operations are
/// synchronous and must not block.
pub trait TimerDriver {
    /// Configure the divider, leaving the counter paused and the alarm disarmed
    fn init(&mut self, bank: TimerBank, prescaler: Prescaler) -> bool;

    /// Load the counter
    fn set_counter(&mut self, bank: TimerBank, value: Ticks);

    /// Start (or resume) counting
    fn start(&mut self, bank: TimerBank);

    /// Pause counting
    fn pause(&mut self, bank: TimerBank);

    /// Bind `callback` to the bank's alarm interrupt
    ///
    /// `flags` selects the interrupt allocation level, see [`intr_flags`].
    fn attach(&mut self, bank: TimerBank, callback: AlarmCallback, flags: u32) -> bool;

    /// Unbind the alarm interrupt callback
    fn detach(&mut self, bank: TimerBank);

    /// Set the alarm to fire after this many prescaled ticks
    fn set_alarm_ticks(&mut self, bank: TimerBank, ticks: Ticks);

    /// Reload the counter from zero when the alarm fires
    fn set_auto_reload(&mut self, bank: TimerBank, enabled: bool);

    /// Arm or disarm the alarm
    fn set_alarm(&mut self, bank: TimerBank, armed: bool);

    /// Release the bank back to the SDK
    fn deinit(&mut self, bank: TimerBank);
}

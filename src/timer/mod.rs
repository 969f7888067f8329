//! Hardware timer manager
//!
//! Owns the fixed pool of hardware timer slots, turns frequency requests
//! into divider values and drives each slot through its claim/arm/cancel
//! lifecycle. Register programming is delegated to a [`TimerDriver`]
//! implemented per target platform.
//!
//! Every operation is synchronous and side-effect free on failure; callers
//! are expected to check return values. Retry policy, if any, is theirs.

mod driver;
mod stats;

pub use driver::{intr_flags, AlarmAck, AlarmCallback, AlarmContext, TimerBank, TimerDriver};
pub use stats::{Precision, Resolved, PRESCALER_MAX};

use crate::board::{APB_CLOCK_HZ, NUM_TIMERS, TIMER_BANKS};

/// Timer frequency in Hz
pub type Freq = u32;
/// Divider applied to the reference clock before the counter
pub type Prescaler = u16;
/// Alarm period in prescaled clock pulses
pub type Ticks = u64;
/// Caller-supplied interrupt priority ordinal
pub type Priority = u8;

/// Identifier of one hardware timer slot
///
/// Only constructible in range, so every `TimerId` indexes a real slot.
/// Where the caller may leave the slot unspecified, the API takes
/// `Option<TimerId>`.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "mock"), derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerId(u8);

impl TimerId {
    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < NUM_TIMERS).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Physical (group, index) binding of this slot
    pub fn bank(self) -> TimerBank {
        TIMER_BANKS[self.index()]
    }
}

/// Lifecycle state of one slot
///
/// `Running` implies logical ownership, so a started-but-unclaimed slot
/// cannot be represented.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "mock"), derive(Debug))]
enum SlotState {
    Free,
    Claimed,
    Running,
}

/// Failure modes of timer operations
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "mock"), derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// Requested frequency is zero or above the board maximum
    InvalidFrequency,
    /// Every slot is claimed or running
    Exhausted,
    /// The slot already has an armed alarm; cancel it first
    AlreadyRunning,
}

/// Outcome of successfully arming a timer
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "mock"), derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Armed {
    pub timer: TimerId,
    /// Frequency the hardware was programmed to; may differ from the request
    pub freq: Freq,
    pub precision: Precision,
}

/// Manager for the fixed pool of hardware timer slots
///
/// The slot array is the sole source of truth for claim/start state. State
/// is reconstructed from scratch at startup: every slot begins free.
pub struct TimerPool<D: TimerDriver> {
    driver: D,
    slots: [SlotState; NUM_TIMERS],
}

impl<D: TimerDriver> TimerPool<D> {
    pub const fn new(driver: D) -> Self {
        Self {
            driver,
            slots: [SlotState::Free; NUM_TIMERS],
        }
    }

    /// First free slot in ascending index order
    ///
    /// The lowest-index scan keeps allocation deterministic; with at most
    /// four slots there is nothing to optimize.
    pub fn next_available(&self) -> Option<TimerId> {
        self.slots
            .iter()
            .position(|state| *state == SlotState::Free)
            .map(|index| TimerId(index as u8))
    }

    /// Reserve the lowest free slot
    ///
    /// The priority hint does not influence allocation; all slots are
    /// equivalent until armed.
    pub fn claim(&mut self, _priority: Priority) -> Option<TimerId> {
        let id = self.next_available()?;
        self.slots[id.index()] = SlotState::Claimed;
        Some(id)
    }

    /// Give back a claimed slot
    ///
    /// Fails without side effects if the slot is free or running; a running
    /// slot has to be cancelled first.
    pub fn release(&mut self, id: TimerId) -> bool {
        if self.slots[id.index()] != SlotState::Claimed {
            return false;
        }
        self.slots[id.index()] = SlotState::Free;
        true
    }

    pub fn is_claimed(&self, id: TimerId) -> bool {
        self.slots[id.index()] != SlotState::Free
    }

    pub fn is_started(&self, id: TimerId) -> bool {
        self.slots[id.index()] == SlotState::Running
    }

    /// Pick a slot and compute divider values for a frequency request
    ///
    /// `slot` of `None` allocates the next available slot; `Some` keeps the
    /// caller's choice. The frequency inside the result is authoritative,
    /// see [`Resolved::freq`]. No peripheral state is touched.
    pub fn resolve(
        &self,
        freq: Freq,
        slot: Option<TimerId>,
    ) -> Result<(TimerId, Resolved), TimerError> {
        let resolved =
            Resolved::compute(APB_CLOCK_HZ, freq).ok_or(TimerError::InvalidFrequency)?;
        let id = match slot {
            Some(id) => id,
            None => self.next_available().ok_or(TimerError::Exhausted)?,
        };
        Ok((id, resolved))
    }

    /// Program a slot to fire `callback` periodically at `freq`
    ///
    /// Arming an already running slot is rejected and leaves its existing
    /// configuration untouched. On success the slot is running and owned,
    /// whether or not it was claimed beforehand.
    pub fn arm(
        &mut self,
        slot: Option<TimerId>,
        freq: Freq,
        callback: AlarmCallback,
        priority: Priority,
    ) -> Result<Armed, TimerError> {
        let (id, resolved) = self.resolve(freq, slot)?;

        if self.slots[id.index()] == SlotState::Running {
            return Err(TimerError::AlreadyRunning);
        }

        let bank = id.bank();

        // divider configured, counter zeroed and counting
        self.driver.init(bank, resolved.prescaler);
        self.driver.set_counter(bank, 0);
        self.driver.start(bank);
        self.driver.attach(bank, callback, intr_flags(priority));

        // periodic alarm armed, counter restarted
        self.driver.set_alarm_ticks(bank, resolved.ticks);
        self.driver.set_auto_reload(bank, true);
        self.driver.set_alarm(bank, true);
        self.driver.start(bank);

        self.slots[id.index()] = SlotState::Running;

        Ok(Armed {
            timer: id,
            freq: resolved.freq,
            precision: resolved.precision,
        })
    }

    /// Tear down a running timer and return its slot to the pool
    ///
    /// Fails without side effects unless the slot is running.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        if self.slots[id.index()] != SlotState::Running {
            return false;
        }

        let bank = id.bank();

        self.driver.set_alarm(bank, false);
        self.driver.pause(bank);
        self.driver.set_counter(bank, 0);

        self.driver.detach(bank);
        self.driver.deinit(bank);

        self.slots[id.index()] = SlotState::Free;
        true
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

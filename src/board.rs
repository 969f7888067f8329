//! Board description
//!
//! Compile-time constants for the target board: clocking, timer pool layout
//! and non-volatile storage size. These are fixed by the hardware and are not
//! configurable at runtime.

use static_assertions as sa;

use crate::timer::TimerBank;

/// APB reference clock feeding the hardware timer prescalers
pub const APB_CLOCK_HZ: u32 = 80_000_000;

/// Number of general purpose hardware timers on the chip
pub const NUM_TIMERS: usize = 4;

/// Highest frequency a user timer may be programmed to
pub const FREQ_MAX: u32 = 5_000_000;

/// Size in bytes of the non-volatile storage partition
pub const NVM_SIZE: usize = 4096;

/// Physical (group, index) binding of each timer slot
///
/// The mapping is fixed: slots alternate between the two timer groups so that
/// consecutive claims land on different groups.
pub const TIMER_BANKS: [TimerBank; NUM_TIMERS] = [
    TimerBank { group: 0, index: 0 },
    TimerBank { group: 1, index: 0 },
    TimerBank { group: 0, index: 1 },
    TimerBank { group: 1, index: 1 },
];

// Slot ids are u8 and the pool state fits a byte-wide mask
sa::const_assert!(NUM_TIMERS <= 8);
sa::const_assert!(FREQ_MAX <= APB_CLOCK_HZ);

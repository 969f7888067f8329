//! Capability mocks for host-side testing
//!
//! Recording implementations of every platform trait. Used by this crate's
//! own tests and, behind the `mock` feature, by firmware integration tests
//! that run on the host.

use heapless::{FnvIndexMap, Vec};

use crate::board::NUM_TIMERS;
use crate::delay::DelayDriver;
use crate::io::{DigitalIo, Level, Pin, PinMode};
use crate::nvm::{NvmBackend, RawKey};
use crate::timer::{AlarmCallback, AlarmContext, Prescaler, Ticks, TimerBank, TimerDriver};

/// One recorded timer driver call
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DriverOp {
    Init { bank: TimerBank, prescaler: Prescaler },
    SetCounter { bank: TimerBank, value: Ticks },
    Start { bank: TimerBank },
    Pause { bank: TimerBank },
    Attach { bank: TimerBank, flags: u32 },
    Detach { bank: TimerBank },
    SetAlarmTicks { bank: TimerBank, ticks: Ticks },
    SetAutoReload { bank: TimerBank, enabled: bool },
    SetAlarm { bank: TimerBank, armed: bool },
    Deinit { bank: TimerBank },
}

/// Timer driver that records every call instead of touching registers
pub struct MockTimerDriver {
    ops: Vec<DriverOp, 64>,
    callbacks: [Option<AlarmCallback>; NUM_TIMERS],
}

// Banks are two groups of two; flatten to an index the same way the
// hardware numbers its interrupt sources
fn bank_slot(bank: TimerBank) -> usize {
    (bank.group + bank.index * 2) as usize
}

impl MockTimerDriver {
    pub const fn new() -> Self {
        Self {
            ops: Vec::new(),
            callbacks: [None; NUM_TIMERS],
        }
    }

    /// Every driver call made so far, in order
    pub fn ops(&self) -> &[DriverOp] {
        &self.ops
    }

    /// Simulate the alarm interrupt for a bank
    ///
    /// Returns the callback's yield request, or `None` when nothing is
    /// attached.
    pub fn fire(&self, bank: TimerBank) -> Option<bool> {
        let callback = self.callbacks[bank_slot(bank)]?;
        Some(callback(AlarmContext::new()).yield_requested())
    }

    fn record(&mut self, op: DriverOp) {
        // Dropping ops past capacity would hide bugs from tests
        assert!(self.ops.push(op).is_ok(), "mock op log full");
    }
}

impl Default for MockTimerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriver for MockTimerDriver {
    fn init(&mut self, bank: TimerBank, prescaler: Prescaler) -> bool {
        self.record(DriverOp::Init { bank, prescaler });
        true
    }

    fn set_counter(&mut self, bank: TimerBank, value: Ticks) {
        self.record(DriverOp::SetCounter { bank, value });
    }

    fn start(&mut self, bank: TimerBank) {
        self.record(DriverOp::Start { bank });
    }

    fn pause(&mut self, bank: TimerBank) {
        self.record(DriverOp::Pause { bank });
    }

    fn attach(&mut self, bank: TimerBank, callback: AlarmCallback, flags: u32) -> bool {
        self.callbacks[bank_slot(bank)] = Some(callback);
        self.record(DriverOp::Attach { bank, flags });
        true
    }

    fn detach(&mut self, bank: TimerBank) {
        self.callbacks[bank_slot(bank)] = None;
        self.record(DriverOp::Detach { bank });
    }

    fn set_alarm_ticks(&mut self, bank: TimerBank, ticks: Ticks) {
        self.record(DriverOp::SetAlarmTicks { bank, ticks });
    }

    fn set_auto_reload(&mut self, bank: TimerBank, enabled: bool) {
        self.record(DriverOp::SetAutoReload { bank, enabled });
    }

    fn set_alarm(&mut self, bank: TimerBank, armed: bool) {
        self.record(DriverOp::SetAlarm { bank, armed });
    }

    fn deinit(&mut self, bank: TimerBank) {
        self.record(DriverOp::Deinit { bank });
    }
}

/// Pin driver remembering the last mode and level written per pin
pub struct MockIo {
    modes: FnvIndexMap<Pin, PinMode, 64>,
    levels: FnvIndexMap<Pin, Level, 64>,
}

impl MockIo {
    pub fn new() -> Self {
        Self {
            modes: FnvIndexMap::new(),
            levels: FnvIndexMap::new(),
        }
    }

    pub fn mode(&self, pin: Pin) -> Option<PinMode> {
        self.modes.get(&pin).copied()
    }

    pub fn level(&self, pin: Pin) -> Option<Level> {
        self.levels.get(&pin).copied()
    }
}

impl Default for MockIo {
    fn default() -> Self {
        Self::new()
    }
}

impl DigitalIo for MockIo {
    fn set_pin_mode(&mut self, pin: Pin, mode: PinMode) {
        let _ = self.modes.insert(pin, mode);
    }

    fn write_pin(&mut self, pin: Pin, level: Level) {
        let _ = self.levels.insert(pin, level);
    }
}

/// Delay driver that only accounts for time instead of waiting
pub struct MockDelay {
    elapsed_us: u64,
}

impl MockDelay {
    pub const fn new() -> Self {
        Self { elapsed_us: 0 }
    }

    /// Total simulated time spent in delays
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }
}

impl Default for MockDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayDriver for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_us = self.elapsed_us.wrapping_add(us as u64);
    }
}

/// A stored value; entries keep the width they were written with
#[derive(Clone, PartialEq, Debug)]
enum Entry {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    Str(Vec<u8, 64>),
}

/// In-memory [`NvmBackend`]
///
/// Behaves like the vendor store: typed entries, data survives close/open,
/// erase wipes everything.
pub struct MemNvm {
    entries: FnvIndexMap<RawKey, Entry, 64>,
    capacity: usize,
    open: bool,
}

macro_rules! mem_access {
    ($set:ident, $get:ident, $ty:ty, $variant:ident) => {
        fn $set(&mut self, key: &RawKey, value: $ty) -> bool {
            self.put(*key, Entry::$variant(value))
        }

        fn $get(&self, key: &RawKey) -> Option<$ty> {
            match self.entries.get(key) {
                Some(Entry::$variant(value)) => Some(*value),
                _ => None,
            }
        }
    };
}

impl MemNvm {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: FnvIndexMap::new(),
            capacity,
            open: false,
        }
    }

    fn put(&mut self, key: RawKey, entry: Entry) -> bool {
        self.open && self.entries.insert(key, entry).is_ok()
    }
}

impl NvmBackend for MemNvm {
    fn open(&mut self) -> bool {
        self.open = true;
        true
    }

    fn close(&mut self) -> bool {
        self.open = false;
        true
    }

    fn erase_all(&mut self) -> bool {
        self.entries.clear();
        true
    }

    fn commit(&mut self) -> bool {
        self.open
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    mem_access!(set_u8, get_u8, u8, U8);
    mem_access!(set_i8, get_i8, i8, I8);
    mem_access!(set_u16, get_u16, u16, U16);
    mem_access!(set_i16, get_i16, i16, I16);
    mem_access!(set_u32, get_u32, u32, U32);
    mem_access!(set_i32, get_i32, i32, I32);
    mem_access!(set_u64, get_u64, u64, U64);
    mem_access!(set_i64, get_i64, i64, I64);

    fn set_bytes(&mut self, key: &RawKey, value: &[u8]) -> bool {
        match Vec::from_slice(value) {
            Ok(bytes) => self.put(*key, Entry::Str(bytes)),
            Err(()) => false,
        }
    }

    fn get_bytes(&self, key: &RawKey, buf: &mut [u8]) -> Option<usize> {
        match self.entries.get(key) {
            Some(Entry::Str(bytes)) if bytes.len() <= buf.len() => {
                buf[..bytes.len()].copy_from_slice(bytes);
                Some(bytes.len())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::AlarmAck;

    fn yielding(ctx: AlarmContext) -> AlarmAck {
        ctx.complete(true)
    }

    #[test]
    fn fire_runs_the_attached_callback() {
        let mut driver = MockTimerDriver::new();
        let bank = TimerBank { group: 0, index: 0 };

        assert_eq!(driver.fire(bank), None);
        driver.attach(bank, yielding, 1);
        assert_eq!(driver.fire(bank), Some(true));
        driver.detach(bank);
        assert_eq!(driver.fire(bank), None);
    }

    #[test]
    fn io_remembers_last_writes() {
        let mut io = MockIo::new();
        assert_eq!(io.mode(23), None);

        io.set_pin_mode(23, PinMode::Output);
        io.write_pin(23, Level::High);
        io.write_pin(23, Level::Low);

        assert_eq!(io.mode(23), Some(PinMode::Output));
        assert_eq!(io.level(23), Some(Level::Low));
        assert_eq!(io.level(7), None);
    }

    #[test]
    fn delay_accumulates_simulated_time() {
        let mut delay = MockDelay::new();
        delay.delay_ms(3);
        delay.delay_us(250);
        assert_eq!(delay.elapsed_us(), 3_250);
    }

    #[test]
    fn mem_nvm_requires_open() {
        let mut nvm = MemNvm::new(4096);
        assert!(!nvm.set_u8(&[0, 1], 5));
        assert!(nvm.open());
        assert!(nvm.set_u8(&[0, 1], 5));
        assert_eq!(nvm.get_u8(&[0, 1]), Some(5));
    }

    #[test]
    fn mem_nvm_is_typed() {
        let mut nvm = MemNvm::new(4096);
        nvm.open();
        nvm.set_u16(&[0, 2], 600);
        assert_eq!(nvm.get_u32(&[0, 2]), None);
        assert_eq!(nvm.get_u16(&[0, 2]), Some(600));
    }

    #[test]
    fn mem_nvm_byte_strings_respect_buffers() {
        let mut nvm = MemNvm::new(4096);
        nvm.open();
        assert!(nvm.set_bytes(&[1, 0], b"waveform"));

        let mut buf = [0u8; 16];
        assert_eq!(nvm.get_bytes(&[1, 0], &mut buf), Some(8));
        assert_eq!(&buf[..8], b"waveform");

        let mut tiny = [0u8; 4];
        assert_eq!(nvm.get_bytes(&[1, 0], &mut tiny), None);
    }
}

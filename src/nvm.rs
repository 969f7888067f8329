//! Persistent key-value store capability
//!
//! Typed wrapper over the vendor non-volatile storage. Values are addressed
//! by small integer keys and stored as their fixed-width bit patterns;
//! floats are reinterpreted bit-for-bit into same-width unsigned integers so
//! NaN payloads and signed zeros survive a round trip.
//!
//! The store is shared between tasks, so every access goes through a
//! [`SpinLock`]; an access while the lock is held elsewhere is a no-op
//! failure, never a wait.

use crate::sync::SpinLock;

/// Integer key addressing one stored value
pub type Key = u16;

/// Key encoded for the backend: the little-endian bytes of the integer key
pub type RawKey = [u8; core::mem::size_of::<Key>()];

/// Size value meaning "not configured"; rejected by [`Nvm::init`]
pub const SIZE_UNSET: usize = 0;

fn raw_key(key: Key) -> RawKey {
    key.to_le_bytes()
}

/// Result of bringing the store online
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "mock"), derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartCode {
    Ok,
    /// Already online; initialization is not repeated
    AlreadyStarted,
    /// Size was the unset sentinel
    InvalidSize,
    /// Backend refused to open, or the store was busy
    Failed,
}

/// Result of a full reset cycle, one failure code per step
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "mock"), derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetCode {
    Ok,
    /// Store is offline so its capacity is unknown
    MaxSizeUnavailable,
    /// Requested size exceeds the backend capacity
    SizeTooBig,
    ClearFailed,
    StopFailed,
    InitFailed,
}

/// Raw typed storage, modeled on the vendor NVS API
///
/// Entries are typed: reading a key back with a different width than it was
/// written with fails. One implementation per target platform.
pub trait NvmBackend {
    /// Bring the storage online
    fn open(&mut self) -> bool;

    /// Take the storage offline; entries survive
    fn close(&mut self) -> bool;

    /// Erase every entry
    fn erase_all(&mut self) -> bool;

    /// Flush pending writes to the medium
    fn commit(&mut self) -> bool;

    /// Total capacity in bytes
    fn capacity(&self) -> usize;

    fn set_u8(&mut self, key: &RawKey, value: u8) -> bool;
    fn set_i8(&mut self, key: &RawKey, value: i8) -> bool;
    fn set_u16(&mut self, key: &RawKey, value: u16) -> bool;
    fn set_i16(&mut self, key: &RawKey, value: i16) -> bool;
    fn set_u32(&mut self, key: &RawKey, value: u32) -> bool;
    fn set_i32(&mut self, key: &RawKey, value: i32) -> bool;
    fn set_u64(&mut self, key: &RawKey, value: u64) -> bool;
    fn set_i64(&mut self, key: &RawKey, value: i64) -> bool;

    fn get_u8(&self, key: &RawKey) -> Option<u8>;
    fn get_i8(&self, key: &RawKey) -> Option<i8>;
    fn get_u16(&self, key: &RawKey) -> Option<u16>;
    fn get_i16(&self, key: &RawKey) -> Option<i16>;
    fn get_u32(&self, key: &RawKey) -> Option<u32>;
    fn get_i32(&self, key: &RawKey) -> Option<i32>;
    fn get_u64(&self, key: &RawKey) -> Option<u64>;
    fn get_i64(&self, key: &RawKey) -> Option<i64>;

    /// Store a byte string
    fn set_bytes(&mut self, key: &RawKey, value: &[u8]) -> bool;

    /// Copy a stored byte string into `buf`, returning its length
    ///
    /// Fails if the entry is missing, is not a byte string, or does not fit.
    fn get_bytes(&self, key: &RawKey, buf: &mut [u8]) -> Option<usize>;
}

/// Typed key-value store with an explicit lifecycle
pub struct Nvm<B: NvmBackend> {
    backend: B,
    lock: SpinLock,
    started: bool,
}

/// Generates the typed accessor pairs; mirrors the one-liner-per-type
/// surface of the vendor API
macro_rules! typed_access {
    ($write:ident, $read:ident, $ty:ty, $set:ident, $get:ident) => {
        pub fn $write(&mut self, key: Key, value: $ty) -> bool {
            if !self.started || !self.lock.enter() {
                return false;
            }
            let ok = self.backend.$set(&raw_key(key), value) && self.backend.commit();
            self.lock.exit();
            ok
        }

        /// A missing entry returns `None`. When `can_default` is false a
        /// stored value equal to the type's default also returns `None`.
        pub fn $read(&self, key: Key, can_default: bool) -> Option<$ty> {
            if !self.started || !self.lock.enter() {
                return None;
            }
            let value = self.backend.$get(&raw_key(key));
            self.lock.exit();
            let value = value?;
            if !can_default && value == <$ty>::default() {
                return None;
            }
            Some(value)
        }
    };
}

impl<B: NvmBackend> Nvm<B> {
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            lock: SpinLock::new(),
            started: false,
        }
    }

    /// Bring the store online
    ///
    /// `size` is the configured partition size; the unset sentinel is
    /// rejected. Initializing an already started store reports
    /// [`StartCode::AlreadyStarted`] and changes nothing.
    pub fn init(&mut self, size: usize) -> StartCode {
        if self.started {
            return StartCode::AlreadyStarted;
        }
        if size == SIZE_UNSET {
            return StartCode::InvalidSize;
        }
        if !self.lock.enter() {
            return StartCode::Failed;
        }
        let opened = self.backend.open();
        self.lock.exit();
        if !opened {
            return StartCode::Failed;
        }
        self.started = true;
        StartCode::Ok
    }

    /// Take the store offline; [`Nvm::init`] is required afterwards
    pub fn stop(&mut self) -> bool {
        if !self.started {
            return false;
        }
        self.backend.close();
        self.started = false;
        true
    }

    /// Erase all stored data
    pub fn clear(&mut self) -> bool {
        self.backend.erase_all()
    }

    /// Backend capacity, known once the store is online
    pub fn max_size(&self) -> Option<usize> {
        self.started.then(|| self.backend.capacity())
    }

    /// The lock guarding the store, for callers coordinating wider regions
    pub fn lock(&self) -> &SpinLock {
        &self.lock
    }

    /// Erase everything and restart the store at `size`
    ///
    /// Runs the full cycle: capacity check, erase, stop, re-init. Each step
    /// has its own failure code so callers can tell where a reset died.
    pub fn reset(&mut self, size: usize) -> ResetCode {
        let max = match self.max_size() {
            Some(max) => max,
            None => return ResetCode::MaxSizeUnavailable,
        };
        if size > max {
            return ResetCode::SizeTooBig;
        }
        if !self.clear() {
            return ResetCode::ClearFailed;
        }
        if !self.stop() {
            return ResetCode::StopFailed;
        }
        if self.init(size) != StartCode::Ok {
            return ResetCode::InitFailed;
        }
        ResetCode::Ok
    }

    typed_access!(write_u8, read_u8, u8, set_u8, get_u8);
    typed_access!(write_i8, read_i8, i8, set_i8, get_i8);
    typed_access!(write_u16, read_u16, u16, set_u16, get_u16);
    typed_access!(write_i16, read_i16, i16, set_i16, get_i16);
    typed_access!(write_u32, read_u32, u32, set_u32, get_u32);
    typed_access!(write_i32, read_i32, i32, set_i32, get_i32);
    typed_access!(write_u64, read_u64, u64, set_u64, get_u64);
    typed_access!(write_i64, read_i64, i64, set_i64, get_i64);

    pub fn write_bool(&mut self, key: Key, value: bool) -> bool {
        self.write_u8(key, value as u8)
    }

    pub fn read_bool(&self, key: Key, can_default: bool) -> Option<bool> {
        self.read_u8(key, can_default).map(|v| v != 0)
    }

    /// Store a float bit-for-bit as a 32-bit unsigned integer
    pub fn write_f32(&mut self, key: Key, value: f32) -> bool {
        self.write_u32(key, value.to_bits())
    }

    /// Floats are never default-gated: an all-zero bit pattern is a
    /// legitimate stored zero
    pub fn read_f32(&self, key: Key, _can_default: bool) -> Option<f32> {
        self.read_u32(key, true).map(f32::from_bits)
    }

    /// Store a double bit-for-bit as a 64-bit unsigned integer
    pub fn write_f64(&mut self, key: Key, value: f64) -> bool {
        self.write_u64(key, value.to_bits())
    }

    /// Floats are never default-gated, see [`Nvm::read_f32`]
    pub fn read_f64(&self, key: Key, _can_default: bool) -> Option<f64> {
        self.read_u64(key, true).map(f64::from_bits)
    }

    /// Store a bounded string; empty or over-long values are rejected
    pub fn write_str(&mut self, key: Key, value: &str, max_length: usize) -> bool {
        if !self.started || value.is_empty() || value.len() > max_length {
            return false;
        }
        if !self.lock.enter() {
            return false;
        }
        let ok = self.backend.set_bytes(&raw_key(key), value.as_bytes()) && self.backend.commit();
        self.lock.exit();
        ok
    }

    /// Copy a stored string into `buf`; fails if it does not fit
    pub fn read_str<'a>(&self, key: Key, buf: &'a mut [u8]) -> Option<&'a str> {
        if !self.started || buf.is_empty() {
            return None;
        }
        if !self.lock.enter() {
            return None;
        }
        let len = self.backend.get_bytes(&raw_key(key), buf);
        self.lock.exit();
        let len = len?;
        core::str::from_utf8(&buf[..len]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::NVM_SIZE;
    use crate::mock::MemNvm;

    fn started() -> Nvm<MemNvm> {
        let mut nvm = Nvm::new(MemNvm::new(NVM_SIZE));
        assert_eq!(nvm.init(NVM_SIZE), StartCode::Ok);
        nvm
    }

    #[test]
    fn lifecycle() {
        let mut nvm = Nvm::new(MemNvm::new(NVM_SIZE));
        assert_eq!(nvm.max_size(), None);
        assert!(!nvm.write_u8(1, 7));
        assert_eq!(nvm.read_u8(1, true), None);
        assert!(!nvm.stop());

        assert_eq!(nvm.init(SIZE_UNSET), StartCode::InvalidSize);
        assert_eq!(nvm.init(NVM_SIZE), StartCode::Ok);
        assert_eq!(nvm.init(NVM_SIZE), StartCode::AlreadyStarted);
        assert_eq!(nvm.max_size(), Some(NVM_SIZE));

        assert!(nvm.stop());
        assert!(!nvm.stop());
    }

    #[test]
    fn entries_survive_stop_and_restart() {
        let mut nvm = started();
        assert!(nvm.write_u32(9, 0xdead_beef));
        assert!(nvm.stop());
        assert_eq!(nvm.read_u32(9, true), None);
        assert_eq!(nvm.init(NVM_SIZE), StartCode::Ok);
        assert_eq!(nvm.read_u32(9, true), Some(0xdead_beef));
    }

    #[test]
    fn integer_round_trips() {
        let mut nvm = started();
        assert!(nvm.write_u8(1, 0xab));
        assert!(nvm.write_i8(2, -5));
        assert!(nvm.write_u16(3, 0xabcd));
        assert!(nvm.write_i16(4, -12345));
        assert!(nvm.write_u32(5, 0xdead_beef));
        assert!(nvm.write_i32(6, -7_654_321));
        assert!(nvm.write_u64(7, u64::MAX - 1));
        assert!(nvm.write_i64(8, i64::MIN + 1));

        assert_eq!(nvm.read_u8(1, false), Some(0xab));
        assert_eq!(nvm.read_i8(2, false), Some(-5));
        assert_eq!(nvm.read_u16(3, false), Some(0xabcd));
        assert_eq!(nvm.read_i16(4, false), Some(-12345));
        assert_eq!(nvm.read_u32(5, false), Some(0xdead_beef));
        assert_eq!(nvm.read_i32(6, false), Some(-7_654_321));
        assert_eq!(nvm.read_u64(7, false), Some(u64::MAX - 1));
        assert_eq!(nvm.read_i64(8, false), Some(i64::MIN + 1));
    }

    #[test]
    fn default_values_are_gated() {
        let mut nvm = started();
        assert!(nvm.write_u32(1, 0));
        assert_eq!(nvm.read_u32(1, false), None);
        assert_eq!(nvm.read_u32(1, true), Some(0));

        assert!(nvm.write_bool(2, false));
        assert_eq!(nvm.read_bool(2, false), None);
        assert_eq!(nvm.read_bool(2, true), Some(false));

        // a missing key fails regardless of the gate
        assert_eq!(nvm.read_u32(99, true), None);
    }

    #[test]
    fn bool_round_trip() {
        let mut nvm = started();
        assert!(nvm.write_bool(1, true));
        assert_eq!(nvm.read_bool(1, false), Some(true));
    }

    #[test]
    fn float_bits_survive_exactly() {
        let mut nvm = started();

        let nan = f32::from_bits(0x7fc0_1234);
        assert!(nvm.write_f32(1, nan));
        let back = nvm.read_f32(1, false).unwrap();
        assert_eq!(back.to_bits(), 0x7fc0_1234);

        assert!(nvm.write_f32(2, -0.0_f32));
        let back = nvm.read_f32(2, false).unwrap();
        assert_eq!(back.to_bits(), (-0.0_f32).to_bits());

        let nan = f64::from_bits(0x7ff8_0000_dead_beef);
        assert!(nvm.write_f64(3, nan));
        let back = nvm.read_f64(3, false).unwrap();
        assert_eq!(back.to_bits(), 0x7ff8_0000_dead_beef);

        assert!(nvm.write_f64(4, -0.0_f64));
        let back = nvm.read_f64(4, false).unwrap();
        assert_eq!(back.to_bits(), (-0.0_f64).to_bits());
    }

    #[test]
    fn zero_float_is_readable_despite_the_gate() {
        let mut nvm = started();
        assert!(nvm.write_f32(1, 0.0));
        // unlike integers, a zero float is not treated as "missing"
        assert_eq!(nvm.read_f32(1, false), Some(0.0));
    }

    #[test]
    fn typed_entries_reject_mismatched_reads() {
        let mut nvm = started();
        assert!(nvm.write_u32(1, 123));
        assert_eq!(nvm.read_u16(1, true), None);
        assert_eq!(nvm.read_u64(1, true), None);
        assert_eq!(nvm.read_u32(1, true), Some(123));
    }

    #[test]
    fn strings_are_bounded() {
        let mut nvm = started();
        assert!(!nvm.write_str(1, "", 8));
        assert!(!nvm.write_str(1, "too long for the field", 8));
        assert!(nvm.write_str(1, "osc", 8));

        let mut buf = [0u8; 8];
        assert_eq!(nvm.read_str(1, &mut buf), Some("osc"));

        let mut tiny = [0u8; 2];
        assert_eq!(nvm.read_str(1, &mut tiny), None);
        assert_eq!(nvm.read_str(1, &mut []), None);
    }

    #[test]
    fn clear_erases_everything() {
        let mut nvm = started();
        assert!(nvm.write_u8(1, 42));
        assert!(nvm.clear());
        assert_eq!(nvm.read_u8(1, true), None);
    }

    #[test]
    fn reset_cycles_the_store() {
        let mut nvm = started();
        assert!(nvm.write_u8(1, 42));
        assert_eq!(nvm.reset(NVM_SIZE), ResetCode::Ok);
        assert_eq!(nvm.read_u8(1, true), None);
        // store is online again after the cycle
        assert!(nvm.write_u8(1, 43));
    }

    #[test]
    fn reset_failure_codes() {
        let mut nvm = Nvm::new(MemNvm::new(NVM_SIZE));
        assert_eq!(nvm.reset(NVM_SIZE), ResetCode::MaxSizeUnavailable);

        assert_eq!(nvm.init(NVM_SIZE), StartCode::Ok);
        assert_eq!(nvm.reset(NVM_SIZE + 1), ResetCode::SizeTooBig);
    }

    #[test]
    fn held_lock_makes_accesses_fail() {
        let mut nvm = started();
        assert!(nvm.write_u8(1, 7));

        assert!(nvm.lock().enter());
        assert!(!nvm.write_u8(1, 8));
        assert_eq!(nvm.read_u8(1, true), None);
        assert!(nvm.lock().exit());

        assert_eq!(nvm.read_u8(1, true), Some(7));
    }
}

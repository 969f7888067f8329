//! Critical section capability
//!
//! A spinlock-style mutually exclusive region shared between task and
//! interrupt context. The port layer's spinlock does not nest: entering
//! while held and exiting while free are no-op failures, the same
//! failure-as-false contract the rest of this crate uses.

use core::sync::atomic::{AtomicU8, Ordering};

/// Critical region with single-level reentrancy accounting
pub struct SpinLock {
    count: AtomicU8,
}

impl SpinLock {
    pub const fn new() -> Self {
        Self { count: AtomicU8::new(0) }
    }

    /// Enter the region; fails if it is already held
    pub fn enter(&self) -> bool {
        self.count
            .compare_exchange(0, 1, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Leave the region; fails unless it is held exactly once
    pub fn exit(&self) -> bool {
        self.count
            .compare_exchange(1, 0, Ordering::Release, Ordering::Relaxed)
            .is_ok()
    }

    pub fn is_held(&self) -> bool {
        self.count.load(Ordering::Relaxed) != 0
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_exit_balance() {
        let lock = SpinLock::new();
        assert!(!lock.is_held());
        assert!(lock.enter());
        assert!(lock.is_held());
        assert!(lock.exit());
        assert!(!lock.is_held());
    }

    #[test]
    fn does_not_nest() {
        let lock = SpinLock::new();
        assert!(lock.enter());
        assert!(!lock.enter());
        // the failed enter did not consume the hold
        assert!(lock.exit());
    }

    #[test]
    fn exit_while_free_fails() {
        let lock = SpinLock::new();
        assert!(!lock.exit());
        assert!(lock.enter());
        assert!(lock.exit());
        assert!(!lock.exit());
    }
}

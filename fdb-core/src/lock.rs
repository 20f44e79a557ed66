//! Database lock hooks
//!
//! [`SpinLock`] is a ready-made [`DbLock`] for targets without an RTOS
//! mutex. Each database gets its own instance, so holding the KV lock
//! never blocks the TS engine.

use portable_atomic::{AtomicBool, Ordering};

use fdb_hal::DbLock;

/// Busy-wait mutual exclusion for one database
///
/// Not reentrant: locking twice from the same context deadlocks.
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

impl SpinLock {
    /// Create an unlocked lock
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Take the lock if it is free
    pub fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Check if the lock is held
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

impl DbLock for SpinLock {
    fn lock(&self) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.is_locked() {
                core::hint::spin_loop();
            }
        }
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

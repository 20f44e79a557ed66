//! Per-database lock hooks
//!
//! The adapter and registry are not internally thread-safe. The engine
//! brackets every flash-touching sequence of one logical database with
//! that database's hooks. KV and TS own separate hooks so one never
//! blocks the other.

/// Logical database identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Database {
    /// Key-value database
    Kv,
    /// Time-series database
    Ts,
}

impl Database {
    /// Short name for logs
    pub fn as_str(self) -> &'static str {
        match self {
            Database::Kv => "kvdb",
            Database::Ts => "tsdb",
        }
    }
}

/// Lock/unlock capability for one logical database
///
/// Implemented once per database by the host (RTOS mutex, critical
/// section, spinlock). `lock` blocks until the database is free; any
/// timeout policy belongs to the implementation.
pub trait DbLock {
    /// Acquire exclusive access
    fn lock(&self);

    /// Release exclusive access
    fn unlock(&self);
}

impl<T: DbLock + ?Sized> DbLock for &T {
    fn lock(&self) {
        (**self).lock()
    }

    fn unlock(&self) {
        (**self).unlock()
    }
}

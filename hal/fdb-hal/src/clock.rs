//! Engine timestamp source

/// Monotonic timestamp source supplied by the engine for TSDB appends
pub trait Clock {
    /// Current timestamp
    ///
    /// Whole seconds when the configured width is 32 bits; the unit is
    /// up to the engine when 64-bit timestamps are configured.
    fn now(&self) -> i64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> i64 {
        (**self).now()
    }
}

//! Storage configuration
//!
//! The single declarative surface an operator changes to retarget the
//! layer: write granularity, timestamp width and logical partition sizes.
//! The adapter and registry read it at initialization; nothing else
//! hardcodes these values.

pub mod error;
#[cfg(feature = "serde")]
pub mod record;
pub mod types;

pub use error::ConfigError;
pub use types::*;

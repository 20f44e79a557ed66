//! Host-side support for the FlashDB FAL
//!
//! - [`flash::SimFlash`] - RAM-backed NOR model with fault injection
//! - [`config`] - `[storage]` TOML loading for operator-edited layouts
//!
//! Used by the integration tests and by host tools that prepare storage
//! images before they are flashed.

#![deny(unsafe_code)]

pub mod config;
pub mod flash;

pub use config::{load_config, parse_config, LoadError};
pub use flash::SimFlash;

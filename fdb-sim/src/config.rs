//! TOML storage configuration
//!
//! Operators describe the storage layout in a `[storage]` table:
//!
//! ```toml
//! [storage]
//! write_granularity_bits = 1
//! timestamp_width_bits = 32
//! kv_partition_size_bytes = 524288
//! ts_partition_size_bytes = 524288
//! ```
//!
//! `kv_partition_name` and `ts_partition_name` are optional. Sizes are
//! checked against the erase block later, once the backing device is known.

use std::fs;
use std::io;
use std::path::Path;

use fdb_core::{ConfigError, StorageConfig};
use serde::Deserialize;
use thiserror::Error;

/// Errors loading a configuration file
#[derive(Debug, Error)]
pub enum LoadError {
    /// File could not be read
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    /// Invalid TOML or missing keys
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    /// Values out of the supported set
    #[error("invalid storage config: {0}")]
    Config(ConfigError),
}

impl From<ConfigError> for LoadError {
    fn from(e: ConfigError) -> Self {
        LoadError::Config(e)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    storage: StorageConfig,
}

/// Parse a configuration from TOML text
pub fn parse_config(text: &str) -> Result<StorageConfig, LoadError> {
    let file: ConfigFile = toml::from_str(text)?;
    let config = file.storage;

    config.check_values()?;
    Ok(config)
}

/// Read and parse a configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<StorageConfig, LoadError> {
    let text = fs::read_to_string(path)?;
    parse_config(&text)
}

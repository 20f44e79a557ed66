//! Storage bring-up sequence
//!
//! Chip init, then partition discovery and validation. Any failure is
//! fatal: the engines must not be bound to a half-configured store.

use core::fmt;

use fdb_hal::{FlashChip, PartitionSource};

use crate::adapter::FlashAdapter;
use crate::config::{ConfigError, StorageConfig};
use crate::device::DeviceError;
use crate::registry::{PartitionRegistry, PartitionTable, RegistryError};

/// Bring-up errors
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Configuration rejected
    Config(ConfigError),
    /// Flash chip failed to come up
    Device(DeviceError),
    /// Partition table could not be built
    Registry(RegistryError),
}

impl From<ConfigError> for StorageError {
    fn from(e: ConfigError) -> Self {
        StorageError::Config(e)
    }
}

impl From<DeviceError> for StorageError {
    fn from(e: DeviceError) -> Self {
        StorageError::Device(e)
    }
}

impl From<RegistryError> for StorageError {
    fn from(e: RegistryError) -> Self {
        StorageError::Registry(e)
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {}", e),
            Self::Device(e) => write!(f, "device: {}", e),
            Self::Registry(e) => write!(f, "registry: {}", e),
        }
    }
}

/// Bring storage up and return the committed partition table
///
/// The adapter's device must have been described with the configured
/// write granularity.
pub fn bring_up<C: FlashChip, S: PartitionSource>(
    config: &StorageConfig,
    adapter: &mut FlashAdapter<C>,
    source: &S,
    registry: &mut PartitionRegistry,
) -> Result<PartitionTable, StorageError> {
    info!("storage bring-up on {}", adapter.device().name.as_str());

    let granularity = config.write_granularity()?;
    let device_granularity = adapter.device().write_granularity;
    if granularity != device_granularity {
        return Err(ConfigError::GranularityMismatch {
            configured: granularity.bits(),
            device: device_granularity.bits(),
        }
        .into());
    }
    config.timestamp_width()?;

    adapter.init()?;
    registry.load(source, &[adapter.device()], config)?;

    Ok(registry.snapshot())
}

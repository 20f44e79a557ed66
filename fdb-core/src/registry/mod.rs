//! Partition registry
//!
//! Builds the logical partition table from the regions the host reports at
//! runtime, validated against the storage configuration before the engine
//! ever touches flash.

pub mod loader;
pub mod table;

use core::fmt;

use heapless::String;

use fdb_hal::MAX_NAME_LEN;

use crate::config::ConfigError;

pub use loader::{build_table, PartitionRegistry};
pub use table::{LogicalPartition, PartitionTable, MAX_LOGICAL_PARTITIONS};

/// Registry errors
///
/// All fatal to storage bring-up. Each carries enough context to fix the
/// storage configuration or the host partition table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// Configured logical partitions do not fit the physical region
    InsufficientSpace {
        /// Physical region name
        partition: String<MAX_NAME_LEN>,
        /// Bytes the configuration needs
        requested: u64,
        /// Bytes the region provides
        available: u64,
    },
    /// Two logical partitions share a name
    DuplicateName {
        /// The repeated name
        name: String<MAX_NAME_LEN>,
    },
    /// No device covers the region's address range
    DeviceNotFound {
        /// Physical region name
        region: String<MAX_NAME_LEN>,
    },
    /// Host table has no region with the storage type tag
    RegionNotFound,
    /// Region does not start on an erase-block boundary
    RegionMisaligned {
        /// Physical region name
        region: String<MAX_NAME_LEN>,
    },
    /// Region shares bytes with an earlier storage region
    Overlap {
        /// Physical region name
        region: String<MAX_NAME_LEN>,
    },
    /// Table already committed; use an explicit rescan
    AlreadyLoaded,
    /// Configuration rejected for the backing device
    Config(ConfigError),
}

impl From<ConfigError> for RegistryError {
    fn from(e: ConfigError) -> Self {
        RegistryError::Config(e)
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientSpace {
                partition,
                requested,
                available,
            } => write!(
                f,
                "region {} too small: {} bytes configured, {} available",
                partition, requested, available
            ),
            Self::DuplicateName { name } => write!(f, "duplicate partition name {}", name),
            Self::DeviceNotFound { region } => {
                write!(f, "no flash device backs region {}", region)
            }
            Self::RegionNotFound => write!(f, "no storage region in partition table"),
            Self::RegionMisaligned { region } => {
                write!(f, "region {} is not erase-block aligned", region)
            }
            Self::Overlap { region } => write!(f, "region {} overlaps another region", region),
            Self::AlreadyLoaded => write!(f, "partition table already loaded"),
            Self::Config(e) => write!(f, "invalid storage config: {}", e),
        }
    }
}

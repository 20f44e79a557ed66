use core::fmt;

use fdb_hal::Database;

/// Configuration errors
///
/// All of these are fatal at startup: storage must not be brought up
/// with an invalid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A partition size is not a multiple of the device erase block
    Misaligned {
        /// Database owning the partition
        database: Database,
        /// Configured size in bytes
        size: u64,
        /// Erase block size of the backing device
        erase_block_size: u32,
    },
    /// Write granularity outside {1, 8, 32, 64}
    UnsupportedGranularity {
        /// Configured granularity in bits
        bits: u8,
    },
    /// Device was described with a different granularity than configured
    GranularityMismatch {
        /// Configured granularity in bits
        configured: u8,
        /// Granularity the device was built with
        device: u8,
    },
    /// Timestamp width outside {32, 64}
    UnsupportedTimestampWidth {
        /// Configured width in bits
        bits: u8,
    },
    /// KV and TS partitions configured with the same name
    DuplicateName,
    /// Partition name longer than the supported maximum
    NameTooLong,
    /// Stored record has an unknown version
    VersionMismatch {
        /// Version found in the record
        found: u8,
    },
    /// Record does not fit the output buffer
    Serialize,
    /// Record could not be decoded
    Deserialize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Misaligned {
                database,
                size,
                erase_block_size,
            } => write!(
                f,
                "{} partition size {} is not a multiple of the {} byte erase block",
                database.as_str(),
                size,
                erase_block_size
            ),
            Self::UnsupportedGranularity { bits } => {
                write!(f, "unsupported write granularity: {} bits", bits)
            }
            Self::GranularityMismatch { configured, device } => write!(
                f,
                "device granularity {} bits differs from configured {} bits",
                device, configured
            ),
            Self::UnsupportedTimestampWidth { bits } => {
                write!(f, "unsupported timestamp width: {} bits", bits)
            }
            Self::DuplicateName => write!(f, "kv and ts partitions share a name"),
            Self::NameTooLong => write!(f, "partition name too long"),
            Self::VersionMismatch { found } => {
                write!(f, "config record version {} is not supported", found)
            }
            Self::Serialize => write!(f, "config record does not fit the buffer"),
            Self::Deserialize => write!(f, "config record is corrupted"),
        }
    }
}

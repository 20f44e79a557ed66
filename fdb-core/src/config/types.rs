//! Configuration type definitions
//!
//! `StorageConfig` is plain data so it can be compiled in, decoded from a
//! postcard record, or parsed from TOML on the host.

use heapless::String;

use fdb_hal::{Database, MAX_NAME_LEN};

use super::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Current configuration record version
pub const CONFIG_VERSION: u8 = 1;

/// Default KV partition name
pub const DEFAULT_KV_NAME: &str = "fdb_kvdb1";

/// Default TS partition name
pub const DEFAULT_TS_NAME: &str = "fdb_tsdb1";

/// Minimum aligned programming unit of the flash technology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteGranularity {
    /// Arbitrary bits can be cleared (NOR flash)
    Bits1,
    /// Byte programming
    Bits8,
    /// Word programming (STM32F2/F4 style)
    Bits32,
    /// Double-word programming (STM32F7/L4 style)
    Bits64,
}

impl WriteGranularity {
    /// Parse a granularity given in bits
    pub fn from_bits(bits: u8) -> Result<Self, ConfigError> {
        match bits {
            1 => Ok(Self::Bits1),
            8 => Ok(Self::Bits8),
            32 => Ok(Self::Bits32),
            64 => Ok(Self::Bits64),
            _ => Err(ConfigError::UnsupportedGranularity { bits }),
        }
    }

    /// Granularity in bits
    pub fn bits(self) -> u8 {
        match self {
            Self::Bits1 => 1,
            Self::Bits8 => 8,
            Self::Bits32 => 32,
            Self::Bits64 => 64,
        }
    }

    /// Required byte alignment of write offsets and lengths
    ///
    /// 1-bit granularity has no alignment requirement beyond whole bytes.
    pub fn align(self) -> u64 {
        match self {
            Self::Bits1 | Self::Bits8 => 1,
            Self::Bits32 => 4,
            Self::Bits64 => 8,
        }
    }

    /// Check that a byte offset or length honours this granularity
    pub fn is_aligned(self, value: u64) -> bool {
        value % self.align() == 0
    }
}

/// On-flash timestamp width used by the time-series database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimestampWidth {
    /// Signed 32-bit seconds, wraps in 2038
    Bits32,
    /// Signed 64-bit, no practical wraparound
    Bits64,
}

impl TimestampWidth {
    /// Parse a width given in bits
    pub fn from_bits(bits: u8) -> Result<Self, ConfigError> {
        match bits {
            32 => Ok(Self::Bits32),
            64 => Ok(Self::Bits64),
            _ => Err(ConfigError::UnsupportedTimestampWidth { bits }),
        }
    }

    /// Width in bits
    pub fn bits(self) -> u8 {
        match self {
            Self::Bits32 => 32,
            Self::Bits64 => 64,
        }
    }

    /// Width in bytes of one encoded timestamp
    pub fn bytes(self) -> usize {
        match self {
            Self::Bits32 => 4,
            Self::Bits64 => 8,
        }
    }
}

/// Storage configuration
///
/// Read-only after startup. Changing only these values retargets the
/// partition table on next boot without touching adapter or registry code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StorageConfig {
    /// Record version
    #[cfg_attr(feature = "serde", serde(default = "default_version"))]
    pub version: u8,
    /// Flash write granularity in bits (1, 8, 32 or 64)
    pub write_granularity_bits: u8,
    /// TSDB timestamp width in bits (32 or 64)
    pub timestamp_width_bits: u8,
    /// KVDB logical partition size; 0 disables the KVDB
    pub kv_partition_size_bytes: u64,
    /// TSDB logical partition size; 0 disables the TSDB
    pub ts_partition_size_bytes: u64,
    /// KVDB logical partition name
    #[cfg_attr(feature = "serde", serde(default = "default_kv_name"))]
    pub kv_partition_name: String<MAX_NAME_LEN>,
    /// TSDB logical partition name
    #[cfg_attr(feature = "serde", serde(default = "default_ts_name"))]
    pub ts_partition_name: String<MAX_NAME_LEN>,
}

#[cfg(feature = "serde")]
fn default_version() -> u8 {
    CONFIG_VERSION
}

fn default_kv_name() -> String<MAX_NAME_LEN> {
    label(DEFAULT_KV_NAME).unwrap_or_default()
}

fn default_ts_name() -> String<MAX_NAME_LEN> {
    label(DEFAULT_TS_NAME).unwrap_or_default()
}

fn label(name: &str) -> Result<String<MAX_NAME_LEN>, ConfigError> {
    let mut out = String::new();
    out.push_str(name).map_err(|_| ConfigError::NameTooLong)?;
    Ok(out)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            write_granularity_bits: 1,
            timestamp_width_bits: 32,
            kv_partition_size_bytes: 512 * 1024,
            ts_partition_size_bytes: 512 * 1024,
            kv_partition_name: default_kv_name(),
            ts_partition_name: default_ts_name(),
        }
    }
}

impl StorageConfig {
    /// Create a configuration with the default partition names
    pub fn new(
        write_granularity_bits: u8,
        timestamp_width_bits: u8,
        kv_partition_size_bytes: u64,
        ts_partition_size_bytes: u64,
    ) -> Self {
        Self {
            version: CONFIG_VERSION,
            write_granularity_bits,
            timestamp_width_bits,
            kv_partition_size_bytes,
            ts_partition_size_bytes,
            kv_partition_name: default_kv_name(),
            ts_partition_name: default_ts_name(),
        }
    }

    /// Override the logical partition names
    pub fn with_partition_names(mut self, kv: &str, ts: &str) -> Result<Self, ConfigError> {
        self.kv_partition_name = label(kv)?;
        self.ts_partition_name = label(ts)?;
        Ok(self)
    }

    /// Configured write granularity
    pub fn write_granularity(&self) -> Result<WriteGranularity, ConfigError> {
        WriteGranularity::from_bits(self.write_granularity_bits)
    }

    /// Configured timestamp width
    pub fn timestamp_width(&self) -> Result<TimestampWidth, ConfigError> {
        TimestampWidth::from_bits(self.timestamp_width_bits)
    }

    /// Declared size of a database's partition
    pub fn partition_size(&self, database: Database) -> u64 {
        match database {
            Database::Kv => self.kv_partition_size_bytes,
            Database::Ts => self.ts_partition_size_bytes,
        }
    }

    /// Logical partition name of a database
    pub fn partition_name(&self, database: Database) -> &str {
        match database {
            Database::Kv => self.kv_partition_name.as_str(),
            Database::Ts => self.ts_partition_name.as_str(),
        }
    }

    /// Check if a database has a partition configured
    pub fn is_enabled(&self, database: Database) -> bool {
        self.partition_size(database) > 0
    }

    /// Bytes the physical region must provide for all logical partitions
    pub fn total_size(&self) -> u64 {
        self.kv_partition_size_bytes
            .saturating_add(self.ts_partition_size_bytes)
    }

    /// Enabled databases in declaration order (KV first, then TS)
    pub fn databases(&self) -> impl Iterator<Item = Database> + '_ {
        [Database::Kv, Database::Ts]
            .into_iter()
            .filter(move |db| self.is_enabled(*db))
    }

    /// Check the values that do not depend on the backing device
    ///
    /// Granularity, timestamp width and distinct partition names.
    pub fn check_values(&self) -> Result<(), ConfigError> {
        self.write_granularity()?;
        self.timestamp_width()?;

        if self.is_enabled(Database::Kv)
            && self.is_enabled(Database::Ts)
            && self.kv_partition_name == self.ts_partition_name
        {
            return Err(ConfigError::DuplicateName);
        }
        Ok(())
    }

    /// Validate against the erase block size of the backing device
    pub fn validate(&self, erase_block_size: u32) -> Result<(), ConfigError> {
        self.check_values()?;

        for database in self.databases() {
            let size = self.partition_size(database);
            if erase_block_size == 0 || size % erase_block_size as u64 != 0 {
                return Err(ConfigError::Misaligned {
                    database,
                    size,
                    erase_block_size,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: u32 = 4096;

    #[test]
    fn test_defaults_match_reference_layout() {
        let config = StorageConfig::default();
        assert_eq!(config.write_granularity(), Ok(WriteGranularity::Bits1));
        assert_eq!(config.timestamp_width(), Ok(TimestampWidth::Bits32));
        assert_eq!(config.total_size(), 1024 * 1024);
        assert_eq!(config.partition_name(Database::Kv), "fdb_kvdb1");
        assert_eq!(config.partition_name(Database::Ts), "fdb_tsdb1");
        assert!(config.validate(BLOCK).is_ok());
    }

    #[test]
    fn test_granularity_alignment() {
        assert_eq!(WriteGranularity::Bits1.align(), 1);
        assert_eq!(WriteGranularity::Bits8.align(), 1);
        assert_eq!(WriteGranularity::Bits32.align(), 4);
        assert_eq!(WriteGranularity::Bits64.align(), 8);
        assert!(WriteGranularity::Bits32.is_aligned(12));
        assert!(!WriteGranularity::Bits64.is_aligned(12));
    }

    #[test]
    fn test_unsupported_granularity() {
        for bits in [0u8, 2, 16, 128] {
            let config = StorageConfig::new(bits, 32, 4096, 4096);
            assert_eq!(
                config.validate(BLOCK),
                Err(ConfigError::UnsupportedGranularity { bits })
            );
        }
    }

    #[test]
    fn test_unsupported_timestamp_width() {
        let config = StorageConfig::new(8, 16, 4096, 4096);
        assert_eq!(
            config.validate(BLOCK),
            Err(ConfigError::UnsupportedTimestampWidth { bits: 16 })
        );
        assert_eq!(TimestampWidth::Bits64.bytes(), 8);
    }

    #[test]
    fn test_misaligned_sizes() {
        let config = StorageConfig::new(8, 32, 4096, 6000);
        assert_eq!(
            config.validate(BLOCK),
            Err(ConfigError::Misaligned {
                database: Database::Ts,
                size: 6000,
                erase_block_size: BLOCK,
            })
        );

        let config = StorageConfig::new(8, 32, 100, 4096);
        assert!(matches!(
            config.validate(BLOCK),
            Err(ConfigError::Misaligned {
                database: Database::Kv,
                ..
            })
        ));
    }

    #[test]
    fn test_disabled_database_is_skipped() {
        let config = StorageConfig::new(32, 64, 8192, 0);
        assert!(config.validate(BLOCK).is_ok());
        assert!(!config.is_enabled(Database::Ts));
        let dbs: heapless::Vec<Database, 2> = config.databases().collect();
        assert_eq!(dbs.as_slice(), &[Database::Kv]);
    }

    #[test]
    fn test_duplicate_names() {
        let config = StorageConfig::default()
            .with_partition_names("shared", "shared")
            .unwrap();
        assert_eq!(config.validate(BLOCK), Err(ConfigError::DuplicateName));
        assert_eq!(config.check_values(), Err(ConfigError::DuplicateName));
    }

    #[test]
    fn test_value_checks_ignore_block_size() {
        let config = StorageConfig::new(8, 32, 100, 6000);
        assert_eq!(config.check_values(), Ok(()));
        assert!(config.validate(BLOCK).is_err());

        let config = StorageConfig::new(8, 40, 4096, 4096);
        assert_eq!(
            config.check_values(),
            Err(ConfigError::UnsupportedTimestampWidth { bits: 40 })
        );

        let shared_but_disabled = StorageConfig::new(8, 32, 4096, 0)
            .with_partition_names("db", "db")
            .unwrap();
        assert_eq!(shared_but_disabled.check_values(), Ok(()));
    }

    #[test]
    fn test_name_too_long() {
        let result =
            StorageConfig::default().with_partition_names("kv", "a_name_well_past_sixteen");
        assert_eq!(result, Err(ConfigError::NameTooLong));
    }
}

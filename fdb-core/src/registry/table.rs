//! Logical partition table
//!
//! The engine-facing view of storage: named byte ranges inside a device,
//! in discovery order. Immutable once committed.

use heapless::{String, Vec};

use fdb_hal::{Database, MAX_NAME_LEN};

/// Maximum logical partitions in one table (one per database)
pub const MAX_LOGICAL_PARTITIONS: usize = 2;

/// Named byte range reserved for one database instance
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogicalPartition {
    /// Partition name, unique across the table
    pub name: String<MAX_NAME_LEN>,
    /// Name of the backing [`FlashDevice`](crate::device::FlashDevice)
    pub device_name: String<MAX_NAME_LEN>,
    /// Start offset inside the device
    pub offset: u64,
    /// Length in bytes
    pub length: u64,
    /// Database the partition was carved for
    pub database: Database,
}

impl LogicalPartition {
    /// Exclusive end offset inside the device
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

/// Ordered sequence of logical partitions
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PartitionTable {
    partitions: Vec<LogicalPartition, MAX_LOGICAL_PARTITIONS>,
}

impl PartitionTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            partitions: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, partition: LogicalPartition) -> Result<(), LogicalPartition> {
        self.partitions.push(partition)
    }

    /// Number of partitions
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Iterate in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &LogicalPartition> {
        self.partitions.iter()
    }

    /// Partitions as a slice
    pub fn as_slice(&self) -> &[LogicalPartition] {
        &self.partitions
    }

    /// Look up a partition by name
    pub fn find(&self, name: &str) -> Option<&LogicalPartition> {
        self.partitions.iter().find(|p| p.name.as_str() == name)
    }

    /// Partitions backed by the named device
    pub fn for_device<'a, 'b>(
        &'a self,
        device_name: &'b str,
    ) -> impl Iterator<Item = &'a LogicalPartition> + 'b
    where
        'a: 'b,
    {
        self.partitions
            .iter()
            .filter(move |p| p.device_name.as_str() == device_name)
    }

    /// First partition carved for a database
    pub fn for_database(&self, database: Database) -> Option<&LogicalPartition> {
        self.partitions.iter().find(|p| p.database == database)
    }
}

//! Registry construction
//!
//! discover -> size-check -> validate -> commit. The table is built into a
//! local value and installed with a single assignment, so a failed build
//! leaves the previously committed table untouched.

use heapless::String;

use fdb_hal::{Database, PartitionDescriptor, PartitionSource, MAX_NAME_LEN, RESERVED_STORAGE_TYPE};

use crate::config::StorageConfig;
use crate::device::FlashDevice;

use super::{LogicalPartition, PartitionTable, RegistryError};

/// Process-wide owner of the committed partition table
///
/// Starts empty. [`load`](Self::load) commits the first table and refuses
/// to run twice; [`rescan`](Self::rescan) rebuilds and swaps explicitly.
#[derive(Debug, Default)]
pub struct PartitionRegistry {
    table: PartitionTable,
    loaded: bool,
}

impl PartitionRegistry {
    /// Create a registry with an empty table
    pub const fn new() -> Self {
        Self {
            table: PartitionTable::new(),
            loaded: false,
        }
    }

    /// Check if a table has been committed
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Committed table (empty before the first successful load)
    pub fn table(&self) -> &PartitionTable {
        &self.table
    }

    /// Owned copy of the committed table for the engine binding
    pub fn snapshot(&self) -> PartitionTable {
        self.table.clone()
    }

    /// Build and commit the table once at startup
    pub fn load<S: PartitionSource>(
        &mut self,
        source: &S,
        devices: &[&FlashDevice],
        config: &StorageConfig,
    ) -> Result<&PartitionTable, RegistryError> {
        if self.loaded {
            warn!("partition table already loaded, rescan required");
            return Err(RegistryError::AlreadyLoaded);
        }
        self.rescan(source, devices, config)
    }

    /// Rebuild the table and replace the committed one
    ///
    /// On failure the previous table stays in place.
    pub fn rescan<S: PartitionSource>(
        &mut self,
        source: &S,
        devices: &[&FlashDevice],
        config: &StorageConfig,
    ) -> Result<&PartitionTable, RegistryError> {
        let table = match build_table(source, devices, config) {
            Ok(table) => table,
            Err(e) => {
                warn!("partition table rejected: {}", e);
                return Err(e);
            }
        };

        self.table = table;
        self.loaded = true;

        info!("partition table committed: {} partitions", self.table.len());
        for p in self.table.iter() {
            debug!(
                "  {} on {}: offset {:#x} len {}",
                p.name.as_str(),
                p.device_name.as_str(),
                p.offset,
                p.length
            );
        }
        Ok(&self.table)
    }
}

fn resolve_device<'a>(
    descriptor: &PartitionDescriptor,
    devices: &[&'a FlashDevice],
) -> Option<&'a FlashDevice> {
    devices
        .iter()
        .copied()
        .find(|d| d.contains_address(descriptor.offset, descriptor.length))
}

/// Build a validated table without committing it
pub fn build_table<S: PartitionSource>(
    source: &S,
    devices: &[&FlashDevice],
    config: &StorageConfig,
) -> Result<PartitionTable, RegistryError> {
    let regions = source.find(RESERVED_STORAGE_TYPE);
    if regions.is_empty() {
        return Err(RegistryError::RegionNotFound);
    }

    let mut table = PartitionTable::new();

    for (i, region) in regions.iter().enumerate() {
        if regions[..i].iter().any(|earlier| earlier.overlaps(region)) {
            return Err(RegistryError::Overlap {
                region: region.name.clone(),
            });
        }

        debug!(
            "storage region {}: {:#x} len {}",
            region.name.as_str(),
            region.offset,
            region.length
        );

        let device = resolve_device(region, devices).ok_or_else(|| {
            RegistryError::DeviceNotFound {
                region: region.name.clone(),
            }
        })?;

        let requested = config.total_size();
        if requested > region.length {
            return Err(RegistryError::InsufficientSpace {
                partition: region.name.clone(),
                requested,
                available: region.length,
            });
        }

        config.validate(device.erase_block_size)?;

        let base = region.offset - device.base_address;
        if !device.is_block_aligned(base) {
            return Err(RegistryError::RegionMisaligned {
                region: region.name.clone(),
            });
        }

        let mut cursor = base;
        for database in config.databases() {
            let length = config.partition_size(database);
            let partition = LogicalPartition {
                name: name_of(config, database),
                device_name: device.name.clone(),
                offset: cursor,
                length,
                database,
            };

            if let Some(existing) = table.find(partition.name.as_str()) {
                return Err(RegistryError::DuplicateName {
                    name: existing.name.clone(),
                });
            }
            table
                .push(partition)
                .map_err(|p| RegistryError::DuplicateName { name: p.name })?;
            cursor += length;
        }
    }

    Ok(table)
}

fn name_of(config: &StorageConfig, database: Database) -> String<MAX_NAME_LEN> {
    match database {
        Database::Kv => config.kv_partition_name.clone(),
        Database::Ts => config.ts_partition_name.clone(),
    }
}

//! Engine binding
//!
//! What the KV and TS engines see: the committed partition table, the
//! storage configuration, a timestamp source, and one lock domain per
//! database. Engines open a [`Session`] for their database; the session
//! holds that database's lock until dropped and confines every flash
//! operation to the database's partition.

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use fdb_hal::{Clock, Database, DbLock, FlashChip};

use crate::adapter::FlashAdapter;
use crate::config::{ConfigError, StorageConfig, TimestampWidth};
use crate::device::DeviceError;
use crate::registry::{LogicalPartition, PartitionTable};
use crate::timestamp::{self, TimestampError};

/// Binding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BindingError {
    /// No partition on this adapter's device was carved for the database
    PartitionMissing(Database),
    /// Flash operation failed
    Device(DeviceError),
    /// Configuration unusable by the engines
    Config(ConfigError),
}

impl From<DeviceError> for BindingError {
    fn from(e: DeviceError) -> Self {
        BindingError::Device(e)
    }
}

impl From<ConfigError> for BindingError {
    fn from(e: ConfigError) -> Self {
        BindingError::Config(e)
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartitionMissing(db) => write!(f, "no partition for {}", db.as_str()),
            Self::Device(e) => write!(f, "flash error: {}", e),
            Self::Config(e) => write!(f, "invalid storage config: {}", e),
        }
    }
}

/// Storage handed to the database engines after bring-up
///
/// `K` and `T` are the KV and TS lock hooks. They are separate so that the
/// two engines never contend on each other's lock. The adapter itself is
/// shared behind `M`, which is held for the whole chip operation: with
/// `CriticalSectionRawMutex` interrupts stay masked until a write or a
/// multi-block erase returns, which can take seconds on NOR parts. Prefer
/// `ThreadModeRawMutex` (or `NoopRawMutex` on a single executor) when the
/// engines only run from thread mode.
pub struct EngineBinding<M: RawMutex, C, K, T> {
    adapter: Mutex<M, RefCell<FlashAdapter<C>>>,
    table: PartitionTable,
    config: StorageConfig,
    timestamp_width: TimestampWidth,
    kv_lock: K,
    ts_lock: T,
}

impl<M, C, K, T> EngineBinding<M, C, K, T>
where
    M: RawMutex,
    C: FlashChip,
    K: DbLock,
    T: DbLock,
{
    /// Bind an initialized adapter to a committed table
    ///
    /// Every enabled database must have a partition on the adapter's
    /// device.
    pub fn new(
        adapter: FlashAdapter<C>,
        table: PartitionTable,
        config: StorageConfig,
        kv_lock: K,
        ts_lock: T,
    ) -> Result<Self, BindingError> {
        if !adapter.is_initialized() {
            return Err(BindingError::Device(DeviceError::NotPresent));
        }
        let timestamp_width = config.timestamp_width()?;

        let device = adapter.device().name.as_str();
        for database in config.databases() {
            let found = table
                .for_device(device)
                .any(|p| p.database == database);
            if !found {
                warn!("no {} partition on {}", database.as_str(), device);
                return Err(BindingError::PartitionMissing(database));
            }
        }

        info!(
            "engines bound to {}: {} partitions, {}-bit timestamps",
            device,
            table.len(),
            timestamp_width.bits()
        );

        Ok(Self {
            adapter: Mutex::new(RefCell::new(adapter)),
            table,
            config,
            timestamp_width,
            kv_lock,
            ts_lock,
        })
    }

    /// Committed partition table
    pub fn table(&self) -> &PartitionTable {
        &self.table
    }

    /// Storage configuration the table was built from
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Width of stored timestamps
    pub fn timestamp_width(&self) -> TimestampWidth {
        self.timestamp_width
    }

    /// Read the clock and encode the value at the configured width
    pub fn encode_timestamp<Cl: Clock>(
        &self,
        clock: &Cl,
        out: &mut [u8],
    ) -> Result<usize, TimestampError> {
        timestamp::encode(self.timestamp_width, clock.now(), out)
    }

    /// Open a session on `database`, blocking until its lock is free
    pub fn session(&self, database: Database) -> Result<Session<'_, M, C>, BindingError> {
        let partition = self.partition(database)?;
        let lock: &dyn DbLock = match database {
            Database::Kv => &self.kv_lock,
            Database::Ts => &self.ts_lock,
        };

        lock.lock();
        trace!("{} locked", database.as_str());
        Ok(Session {
            adapter: &self.adapter,
            partition,
            lock,
        })
    }

    fn partition(&self, database: Database) -> Result<&LogicalPartition, BindingError> {
        let device = self
            .adapter
            .lock(|adapter| adapter.borrow().device().name.clone());
        self.table
            .iter()
            .find(|p| p.device_name == device && p.database == database)
            .ok_or(BindingError::PartitionMissing(database))
    }

    /// Tear down the binding and return the adapter
    pub fn into_adapter(self) -> FlashAdapter<C> {
        self.adapter.into_inner().into_inner()
    }
}

/// Exclusive access to one database's partition
///
/// Offsets are relative to the partition start. Unlocks on drop.
pub struct Session<'a, M: RawMutex, C> {
    adapter: &'a Mutex<M, RefCell<FlashAdapter<C>>>,
    partition: &'a LogicalPartition,
    lock: &'a dyn DbLock,
}

impl<'a, M: RawMutex, C: FlashChip> Session<'a, M, C> {
    /// Partition this session is confined to
    pub fn partition(&self) -> &LogicalPartition {
        self.partition
    }

    /// Partition length in bytes
    pub fn len(&self) -> u64 {
        self.partition.length
    }

    /// Check if the partition is empty
    pub fn is_empty(&self) -> bool {
        self.partition.length == 0
    }

    fn device_offset(&self, offset: u64, length: u64) -> Result<u64, DeviceError> {
        match offset.checked_add(length) {
            Some(end) if end <= self.partition.length => Ok(self.partition.offset + offset),
            _ => {
                warn!(
                    "{} access out of partition: {:#x} len {}",
                    self.partition.name.as_str(),
                    offset,
                    length
                );
                Err(DeviceError::OutOfRange)
            }
        }
    }

    /// Read `buf.len()` bytes at partition offset `offset`
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        let at = self.device_offset(offset, buf.len() as u64)?;
        self.adapter.lock(|a| a.borrow_mut().read(at, buf))
    }

    /// Program `data` at partition offset `offset`
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        let at = self.device_offset(offset, data.len() as u64)?;
        self.adapter.lock(|a| a.borrow_mut().write(at, data))
    }

    /// Erase `length` bytes at partition offset `offset`
    pub fn erase(&self, offset: u64, length: u64) -> Result<(), DeviceError> {
        let at = self.device_offset(offset, length)?;
        self.adapter.lock(|a| a.borrow_mut().erase(at, length))
    }
}

impl<M: RawMutex, C> Drop for Session<'_, M, C> {
    fn drop(&mut self) {
        self.lock.unlock();
        trace!("{} unlocked", self.partition.database.as_str());
    }
}

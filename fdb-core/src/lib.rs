//! Board-agnostic flash abstraction layer for the FlashDB engines
//!
//! This crate sits between the KV/TS database engines and whatever flash
//! the board provides:
//!
//! - Storage configuration (granularity, timestamp width, partition sizes)
//! - Flash device adapter with granularity and erase-block enforcement
//! - Partition registry carving the storage region into KV and TS partitions
//! - Engine binding with per-database lock domains
//!
//! Bring-up order: [`bringup::bring_up`] (chip init, then registry load),
//! then [`binding::EngineBinding::new`]. Engines only ever see the binding.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

pub mod adapter;
pub mod binding;
pub mod bringup;
pub mod config;
pub mod device;
pub mod lock;
pub mod registry;
pub mod timestamp;

pub use adapter::FlashAdapter;
pub use binding::{BindingError, EngineBinding, Session};
pub use bringup::{bring_up, StorageError};
pub use config::{ConfigError, StorageConfig, TimestampWidth, WriteGranularity};
pub use device::{DeviceError, FlashDevice, ERASED_BYTE};
pub use lock::SpinLock;
pub use registry::{LogicalPartition, PartitionRegistry, PartitionTable, RegistryError};
pub use timestamp::TimestampError;

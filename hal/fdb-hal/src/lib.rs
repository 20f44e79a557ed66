//! FlashDB FAL Hardware Abstraction Layer
//!
//! This crate defines the interfaces the flash abstraction layer consumes
//! from the host: raw chip primitives, the partition table enumerator, the
//! per-database lock hooks and the engine's clock. Board crates implement
//! them; `fdb-core` only ever talks to these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  FlashDB engine (KVDB / TSDB)           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  fdb-core (registry, adapter, binding)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  fdb-hal (this crate - traits)          │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  board flash  │       │    fdb-sim    │
//! │  (NorFlash)   │       │  (host model) │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::FlashChip`] - Raw chip init/read/write/erase
//! - [`partition::PartitionSource`] - Physical partition enumerator
//! - [`lock::DbLock`] - Lock/unlock hooks for one logical database
//! - [`clock::Clock`] - Engine timestamp source

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod flash;
pub mod lock;
pub mod partition;

// Re-export key traits at crate root for convenience
pub use clock::Clock;
pub use flash::{ChipFault, FlashChip, NorFlashChip};
pub use lock::{Database, DbLock};
pub use partition::{
    PartitionDescriptor, PartitionList, PartitionSource, MAX_DESCRIPTORS, MAX_NAME_LEN,
    RESERVED_STORAGE_TYPE,
};

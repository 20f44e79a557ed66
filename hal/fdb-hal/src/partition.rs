//! Physical partition enumeration
//!
//! The host's partition table (ESP-IDF `partitions.csv`, a bootloader
//! layout, a fixed board map...) is opaque to the abstraction layer. It is
//! only seen through [`PartitionSource`], which hands out descriptors of
//! the regions tagged for database storage.

use heapless::{String, Vec};

/// Type tag marking a physical region reserved for FlashDB storage
pub const RESERVED_STORAGE_TYPE: u8 = 0x40;

/// Maximum partition name length
pub const MAX_NAME_LEN: usize = 16;

/// Maximum descriptors returned by a single query
pub const MAX_DESCRIPTORS: usize = 8;

/// Raw record produced by the partition enumerator
///
/// `offset` is an absolute flash address. Descriptors are transient:
/// they are consumed while the registry is built and not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PartitionDescriptor {
    /// Partition label from the host table
    pub name: String<MAX_NAME_LEN>,
    /// Partition type tag
    pub type_tag: u8,
    /// Absolute start address
    pub offset: u64,
    /// Length in bytes
    pub length: u64,
}

impl PartitionDescriptor {
    /// Build a descriptor, truncating the name to [`MAX_NAME_LEN`]
    pub fn new(name: &str, type_tag: u8, offset: u64, length: u64) -> Self {
        let mut label = String::new();
        for c in name.chars() {
            if label.push(c).is_err() {
                break;
            }
        }
        Self {
            name: label,
            type_tag,
            offset,
            length,
        }
    }

    /// Exclusive end address
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    /// Check if two descriptors share any address
    pub fn overlaps(&self, other: &PartitionDescriptor) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Partition enumerator
///
/// Implemented by the host environment.
pub trait PartitionSource {
    /// Return every descriptor whose type tag equals `type_tag`,
    /// in table order
    fn find(&self, type_tag: u8) -> Vec<PartitionDescriptor, MAX_DESCRIPTORS>;
}

/// Fixed in-memory partition table
///
/// For boards whose layout is known at build time, and for tests.
#[derive(Debug, Clone, Default)]
pub struct PartitionList {
    entries: Vec<PartitionDescriptor, MAX_DESCRIPTORS>,
}

impl PartitionList {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a descriptor
    ///
    /// Returns the descriptor back if the table is full.
    pub fn push(&mut self, descriptor: PartitionDescriptor) -> Result<(), PartitionDescriptor> {
        self.entries.push(descriptor)
    }

    /// Builder-style [`push`](Self::push) for fixed board tables
    ///
    /// # Panics
    ///
    /// If the table already holds [`MAX_DESCRIPTORS`] entries.
    pub fn with(mut self, descriptor: PartitionDescriptor) -> Self {
        if self.entries.push(descriptor).is_err() {
            panic!("partition list holds at most {} entries", MAX_DESCRIPTORS);
        }
        self
    }

    /// Number of entries of any type
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartitionSource for PartitionList {
    fn find(&self, type_tag: u8) -> Vec<PartitionDescriptor, MAX_DESCRIPTORS> {
        self.entries
            .iter()
            .filter(|d| d.type_tag == type_tag)
            .cloned()
            .collect()
    }
}

impl<T: PartitionSource + ?Sized> PartitionSource for &T {
    fn find(&self, type_tag: u8) -> Vec<PartitionDescriptor, MAX_DESCRIPTORS> {
        (**self).find(type_tag)
    }
}

//! Flash device description
//!
//! One physical chip or memory-mapped flash region, built at startup from
//! board constants. Immutable once the adapter owns it; everything else
//! refers to it by name.

use core::fmt;

use heapless::String;

use fdb_hal::MAX_NAME_LEN;

use crate::config::WriteGranularity;

/// Value every byte reads back as after an erase
pub const ERASED_BYTE: u8 = 0xFF;

/// Device errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// Chip could not be addressed (or was never initialized)
    NotPresent,
    /// Request extends past the end of the device
    OutOfRange,
    /// Offset or length violates write granularity or erase-block alignment
    Misaligned,
    /// Chip stopped part way (power loss, bus fault)
    ///
    /// The affected range is in an unknown state; recovery is the
    /// engine's job.
    Incomplete {
        /// Bytes the chip reported as processed
        completed: u64,
    },
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPresent => write!(f, "flash device not present"),
            Self::OutOfRange => write!(f, "request out of device range"),
            Self::Misaligned => write!(f, "request misaligned"),
            Self::Incomplete { completed } => {
                write!(f, "operation incomplete after {} bytes", completed)
            }
        }
    }
}

/// Physical flash device
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashDevice {
    /// Unique device name
    pub name: String<MAX_NAME_LEN>,
    /// Absolute address of the first byte
    pub base_address: u64,
    /// Size in bytes
    pub total_length: u64,
    /// Smallest erasable unit in bytes
    pub erase_block_size: u32,
    /// Programming granularity
    pub write_granularity: WriteGranularity,
}

impl FlashDevice {
    /// Describe a device; the name is truncated to [`MAX_NAME_LEN`]
    pub fn new(
        name: &str,
        base_address: u64,
        total_length: u64,
        erase_block_size: u32,
        write_granularity: WriteGranularity,
    ) -> Self {
        let mut label = String::new();
        for c in name.chars() {
            if label.push(c).is_err() {
                break;
            }
        }
        Self {
            name: label,
            base_address,
            total_length,
            erase_block_size,
            write_granularity,
        }
    }

    /// Exclusive end address
    pub fn end_address(&self) -> u64 {
        self.base_address.saturating_add(self.total_length)
    }

    /// Check that `[offset, offset + length)` lies inside the device
    ///
    /// `offset` is device-relative.
    pub fn contains(&self, offset: u64, length: u64) -> bool {
        match offset.checked_add(length) {
            Some(end) => end <= self.total_length,
            None => false,
        }
    }

    /// Check that an absolute address range lies inside the device
    pub fn contains_address(&self, address: u64, length: u64) -> bool {
        address >= self.base_address && self.contains(address - self.base_address, length)
    }

    /// Check that a device-relative offset or length is erase-block aligned
    pub fn is_block_aligned(&self, value: u64) -> bool {
        self.erase_block_size != 0 && value % self.erase_block_size as u64 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> FlashDevice {
        FlashDevice::new("norflash0", 0x10_0000, 0x4_0000, 4096, WriteGranularity::Bits8)
    }

    #[test]
    fn test_contains() {
        let dev = device();
        assert!(dev.contains(0, 0x4_0000));
        assert!(dev.contains(0x3_F000, 0x1000));
        assert!(!dev.contains(0x3_F000, 0x1001));
        assert!(!dev.contains(u64::MAX, 2));
    }

    #[test]
    fn test_contains_address() {
        let dev = device();
        assert_eq!(dev.end_address(), 0x14_0000);
        assert!(dev.contains_address(0x10_0000, 0x4_0000));
        assert!(!dev.contains_address(0x0F_F000, 0x1000));
        assert!(!dev.contains_address(0x13_F000, 0x2000));
    }

    #[test]
    fn test_block_alignment() {
        let dev = device();
        assert!(dev.is_block_aligned(0));
        assert!(dev.is_block_aligned(8192));
        assert!(!dev.is_block_aligned(100));

        let broken = FlashDevice::new("broken", 0, 4096, 0, WriteGranularity::Bits1);
        assert!(!broken.is_block_aligned(0));
    }
}

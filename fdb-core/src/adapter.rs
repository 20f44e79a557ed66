//! Flash device adapter
//!
//! Translates the engine's device-relative read/write/erase requests into
//! chip operations while enforcing the configured write granularity and
//! erase-block alignment.
//!
//! The adapter never erases implicitly: a range must be erased before the
//! bytes written into it are meaningful, since programming can only clear
//! bits. Torn operations are reported as [`DeviceError::Incomplete`] and
//! never retried here.

use fdb_hal::FlashChip;

use crate::device::{DeviceError, FlashDevice, ERASED_BYTE};

/// Record a caller bug: log it, and assert in strict debug builds
fn misuse(err: DeviceError, op: &str, offset: u64, length: u64) -> DeviceError {
    error!(
        "flash {} rejected: {} at offset {:#x} len {}",
        op,
        err,
        offset,
        length
    );
    #[cfg(feature = "strict")]
    debug_assert!(false, "flash {} misuse: {}", op, err);
    err
}

/// Flash device adapter
///
/// Owns one [`FlashDevice`] and the chip driver behind it. Not internally
/// synchronized: callers serialize access through the database lock hooks.
pub struct FlashAdapter<C> {
    device: FlashDevice,
    chip: C,
    initialized: bool,
}

impl<C: FlashChip> FlashAdapter<C> {
    /// Create an adapter for `device`, backed by `chip`
    pub fn new(device: FlashDevice, chip: C) -> Self {
        Self {
            device,
            chip,
            initialized: false,
        }
    }

    /// Device this adapter drives
    pub fn device(&self) -> &FlashDevice {
        &self.device
    }

    /// Check if [`init`](Self::init) has succeeded
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Byte value of erased flash
    pub fn erase_value(&self) -> u8 {
        ERASED_BYTE
    }

    /// Borrow the chip driver
    pub fn chip(&self) -> &C {
        &self.chip
    }

    /// Consume the adapter and return the chip driver
    pub fn into_chip(self) -> C {
        self.chip
    }

    /// One-time chip bring-up
    ///
    /// Idempotent: once the chip is up, further calls do nothing.
    pub fn init(&mut self) -> Result<(), DeviceError> {
        if self.initialized {
            debug!("flash {} already initialized", self.device.name.as_str());
            return Ok(());
        }

        if !self.chip.init() {
            error!("flash {} not present", self.device.name.as_str());
            return Err(DeviceError::NotPresent);
        }

        self.initialized = true;
        info!(
            "flash {} ready: {} bytes at {:#x}, erase block {}, granularity {} bits",
            self.device.name.as_str(),
            self.device.total_length,
            self.device.base_address,
            self.device.erase_block_size,
            self.device.write_granularity.bits()
        );
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), DeviceError> {
        if self.initialized {
            Ok(())
        } else {
            Err(DeviceError::NotPresent)
        }
    }

    fn address(&self, offset: u64) -> u64 {
        self.device.base_address + offset
    }

    /// Read `buf.len()` bytes at device offset `offset`
    ///
    /// Reads have no alignment constraint.
    pub fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        self.ensure_ready()?;

        let length = buf.len() as u64;
        if !self.device.contains(offset, length) {
            return Err(misuse(DeviceError::OutOfRange, "read", offset, length));
        }
        if buf.is_empty() {
            return Ok(());
        }

        match self.chip.read(self.address(offset), buf) {
            Ok(n) if n == buf.len() => Ok(()),
            Ok(n) => {
                warn!("flash read short: {} of {} bytes at {:#x}", n, length, offset);
                Err(DeviceError::Incomplete {
                    completed: n as u64,
                })
            }
            Err(fault) => {
                warn!("flash read failed at {:#x}: {}", offset, fault.code());
                Err(DeviceError::Incomplete { completed: 0 })
            }
        }
    }

    /// Program `data` at device offset `offset`
    ///
    /// Offset and length must be multiples of the write granularity (no
    /// constraint for 1- and 8-bit granularity). The range must have been
    /// erased first.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        self.ensure_ready()?;

        let length = data.len() as u64;
        let granularity = self.device.write_granularity;
        if !granularity.is_aligned(offset) || !granularity.is_aligned(length) {
            return Err(misuse(DeviceError::Misaligned, "write", offset, length));
        }
        if !self.device.contains(offset, length) {
            return Err(misuse(DeviceError::OutOfRange, "write", offset, length));
        }
        if data.is_empty() {
            return Ok(());
        }

        match self.chip.write(self.address(offset), data) {
            Ok(n) if n == data.len() => Ok(()),
            Ok(n) => {
                warn!("flash write torn: {} of {} bytes at {:#x}", n, length, offset);
                Err(DeviceError::Incomplete {
                    completed: n as u64,
                })
            }
            Err(fault) => {
                warn!("flash write failed at {:#x}: {}", offset, fault.code());
                Err(DeviceError::Incomplete { completed: 0 })
            }
        }
    }

    /// Erase `length` bytes at device offset `offset`
    ///
    /// Both must be exact multiples of the erase block size.
    pub fn erase(&mut self, offset: u64, length: u64) -> Result<(), DeviceError> {
        self.ensure_ready()?;

        if !self.device.is_block_aligned(offset) || !self.device.is_block_aligned(length) {
            return Err(misuse(DeviceError::Misaligned, "erase", offset, length));
        }
        if !self.device.contains(offset, length) {
            return Err(misuse(DeviceError::OutOfRange, "erase", offset, length));
        }
        if length == 0 {
            return Ok(());
        }

        match self.chip.erase(self.address(offset), length) {
            Ok(n) if n == length => Ok(()),
            Ok(n) => {
                warn!("flash erase torn: {} of {} bytes at {:#x}", n, length, offset);
                Err(DeviceError::Incomplete { completed: n })
            }
            Err(fault) => {
                warn!("flash erase failed at {:#x}: {}", offset, fault.code());
                Err(DeviceError::Incomplete { completed: 0 })
            }
        }
    }
}

//! Flash chip primitives
//!
//! The lowest level the abstraction layer talks to: a chip that can be
//! brought up, read, programmed and erased at absolute addresses. Chips
//! report how many bytes they actually processed so the layer above can
//! tell a torn operation from a completed one.

use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind};

/// Negative status code reported by a chip driver
///
/// Drivers written against a C-style API return a byte count on success
/// and a negative sentinel on failure; the sentinel is carried here as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipFault(pub i32);

impl ChipFault {
    /// Unspecified bus or device failure
    pub const GENERIC: Self = Self(-1);
    /// Address or length violated the chip's alignment rules
    pub const NOT_ALIGNED: Self = Self(-2);
    /// Address range falls outside the chip
    pub const OUT_OF_BOUNDS: Self = Self(-3);

    /// Raw status code
    pub fn code(self) -> i32 {
        self.0
    }
}

impl core::fmt::Display for ChipFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "chip fault {}", self.0)
    }
}

/// Raw flash chip operations
///
/// Addresses are absolute chip addresses. Every data operation returns the
/// number of bytes processed; a count lower than requested means the chip
/// stopped part way (power loss, bus fault).
pub trait FlashChip {
    /// One-time chip bring-up
    ///
    /// Returns `false` if the chip cannot be addressed.
    fn init(&mut self) -> bool;

    /// Read `buf.len()` bytes starting at `addr`
    fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<usize, ChipFault>;

    /// Program `data` starting at `addr`
    ///
    /// Programming can only clear bits; the target range must have been
    /// erased beforehand for the result to equal `data`.
    fn write(&mut self, addr: u64, data: &[u8]) -> Result<usize, ChipFault>;

    /// Erase `len` bytes starting at `addr` back to the erased state
    fn erase(&mut self, addr: u64, len: u64) -> Result<u64, ChipFault>;
}

impl<T: FlashChip + ?Sized> FlashChip for &mut T {
    fn init(&mut self) -> bool {
        (**self).init()
    }

    fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<usize, ChipFault> {
        (**self).read(addr, buf)
    }

    fn write(&mut self, addr: u64, data: &[u8]) -> Result<usize, ChipFault> {
        (**self).write(addr, data)
    }

    fn erase(&mut self, addr: u64, len: u64) -> Result<u64, ChipFault> {
        (**self).erase(addr, len)
    }
}

/// [`FlashChip`] on top of any `embedded-storage` NOR flash driver
///
/// Lets board crates hand their HAL flash peripheral (embassy, esp-hal,
/// ...) straight to the abstraction layer. The driver is assumed to be
/// ready once constructed, so `init` always succeeds.
pub struct NorFlashChip<F> {
    flash: F,
}

impl<F: NorFlash> NorFlashChip<F> {
    /// Wrap a NOR flash driver
    pub fn new(flash: F) -> Self {
        Self { flash }
    }

    /// Get the wrapped driver back
    pub fn into_inner(self) -> F {
        self.flash
    }

    /// Erase block size advertised by the driver
    pub fn erase_size(&self) -> u32 {
        F::ERASE_SIZE as u32
    }

    /// Capacity advertised by the driver
    pub fn capacity(&self) -> u64 {
        self.flash.capacity() as u64
    }
}

fn to_u32(addr: u64) -> Result<u32, ChipFault> {
    u32::try_from(addr).map_err(|_| ChipFault::OUT_OF_BOUNDS)
}

fn map_error<E: NorFlashError>(e: E) -> ChipFault {
    match e.kind() {
        NorFlashErrorKind::NotAligned => ChipFault::NOT_ALIGNED,
        NorFlashErrorKind::OutOfBounds => ChipFault::OUT_OF_BOUNDS,
        _ => ChipFault::GENERIC,
    }
}

impl<F: NorFlash> FlashChip for NorFlashChip<F> {
    fn init(&mut self) -> bool {
        true
    }

    fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<usize, ChipFault> {
        self.flash.read(to_u32(addr)?, buf).map_err(map_error)?;
        Ok(buf.len())
    }

    fn write(&mut self, addr: u64, data: &[u8]) -> Result<usize, ChipFault> {
        self.flash.write(to_u32(addr)?, data).map_err(map_error)?;
        Ok(data.len())
    }

    fn erase(&mut self, addr: u64, len: u64) -> Result<u64, ChipFault> {
        let from = to_u32(addr)?;
        let to = to_u32(addr.checked_add(len).ok_or(ChipFault::OUT_OF_BOUNDS)?)?;
        self.flash.erase(from, to).map_err(map_error)?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_storage::nor_flash::{ErrorType, ReadNorFlash};

    #[derive(Debug)]
    struct MockError(NorFlashErrorKind);

    impl NorFlashError for MockError {
        fn kind(&self) -> NorFlashErrorKind {
            self.0
        }
    }

    struct MockNor {
        mem: [u8; 64],
    }

    impl ErrorType for MockNor {
        type Error = MockError;
    }

    impl ReadNorFlash for MockNor {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            let end = start + bytes.len();
            if end > self.mem.len() {
                return Err(MockError(NorFlashErrorKind::OutOfBounds));
            }
            bytes.copy_from_slice(&self.mem[start..end]);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.mem.len()
        }
    }

    impl NorFlash for MockNor {
        const WRITE_SIZE: usize = 4;
        const ERASE_SIZE: usize = 16;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            if from % 16 != 0 || to % 16 != 0 {
                return Err(MockError(NorFlashErrorKind::NotAligned));
            }
            self.mem[from as usize..to as usize].fill(0xFF);
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            if offset % 4 != 0 || bytes.len() % 4 != 0 {
                return Err(MockError(NorFlashErrorKind::NotAligned));
            }
            for (dst, src) in self.mem[offset as usize..].iter_mut().zip(bytes) {
                *dst &= *src;
            }
            Ok(())
        }
    }

    #[test]
    fn test_nor_chip_round_trip() {
        let mut chip = NorFlashChip::new(MockNor { mem: [0xFF; 64] });
        assert!(chip.init());
        assert_eq!(chip.erase_size(), 16);
        assert_eq!(chip.capacity(), 64);

        assert_eq!(chip.write(16, &[1, 2, 3, 4]), Ok(4));
        let mut buf = [0u8; 4];
        assert_eq!(chip.read(16, &mut buf), Ok(4));
        assert_eq!(buf, [1, 2, 3, 4]);

        assert_eq!(chip.erase(16, 16), Ok(16));
        chip.read(16, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 4]);
    }

    #[test]
    fn test_nor_chip_maps_error_kinds() {
        let mut chip = NorFlashChip::new(MockNor { mem: [0xFF; 64] });
        assert_eq!(chip.write(2, &[0; 4]), Err(ChipFault::NOT_ALIGNED));
        let mut buf = [0u8; 8];
        assert_eq!(chip.read(60, &mut buf), Err(ChipFault::OUT_OF_BOUNDS));
        assert_eq!(chip.erase(u64::MAX - 4, 1), Err(ChipFault::OUT_OF_BOUNDS));
    }
}

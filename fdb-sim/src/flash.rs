//! RAM-backed NOR flash model
//!
//! Behaves like real NOR: erase sets bytes to `0xFF`, programming can only
//! clear bits. Faults can be injected to exercise torn-write handling.

use fdb_core::ERASED_BYTE;
use fdb_hal::{ChipFault, FlashChip};

/// Simulated flash chip
#[derive(Debug, Clone)]
pub struct SimFlash {
    base: u64,
    mem: Vec<u8>,
    present: bool,
    init_calls: u32,
    write_budget: Option<usize>,
}

impl SimFlash {
    /// Erased chip of `len` bytes mapped at address 0
    pub fn new(len: usize) -> Self {
        Self::with_base(0, len)
    }

    /// Erased chip of `len` bytes mapped at `base`
    pub fn with_base(base: u64, len: usize) -> Self {
        Self {
            base,
            mem: vec![ERASED_BYTE; len],
            present: true,
            init_calls: 0,
            write_budget: None,
        }
    }

    /// Chip that never answers its init sequence
    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::new(0)
        }
    }

    /// Stop programming after `bytes` more bytes, as if power were lost
    pub fn fail_after(mut self, bytes: usize) -> Self {
        self.write_budget = Some(bytes);
        self
    }

    /// Number of times the chip init sequence has run
    pub fn init_calls(&self) -> u32 {
        self.init_calls
    }

    /// Raw chip contents
    pub fn bytes(&self) -> &[u8] {
        &self.mem
    }

    fn span(&self, addr: u64, len: u64) -> Result<core::ops::Range<usize>, ChipFault> {
        let start = addr
            .checked_sub(self.base)
            .ok_or(ChipFault::OUT_OF_BOUNDS)?;
        let end = start.checked_add(len).ok_or(ChipFault::OUT_OF_BOUNDS)?;
        if end > self.mem.len() as u64 {
            return Err(ChipFault::OUT_OF_BOUNDS);
        }
        Ok(start as usize..end as usize)
    }
}

impl FlashChip for SimFlash {
    fn init(&mut self) -> bool {
        self.init_calls += 1;
        self.present
    }

    fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<usize, ChipFault> {
        let span = self.span(addr, buf.len() as u64)?;
        buf.copy_from_slice(&self.mem[span]);
        Ok(buf.len())
    }

    fn write(&mut self, addr: u64, data: &[u8]) -> Result<usize, ChipFault> {
        let span = self.span(addr, data.len() as u64)?;
        let count = match self.write_budget {
            Some(budget) => budget.min(data.len()),
            None => data.len(),
        };
        if let Some(budget) = self.write_budget.as_mut() {
            *budget -= count;
        }

        for (cell, byte) in self.mem[span].iter_mut().zip(&data[..count]) {
            *cell &= *byte;
        }
        Ok(count)
    }

    fn erase(&mut self, addr: u64, len: u64) -> Result<u64, ChipFault> {
        let span = self.span(addr, len)?;
        self.mem[span].fill(ERASED_BYTE);
        Ok(len)
    }
}

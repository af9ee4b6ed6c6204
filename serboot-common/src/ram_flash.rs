// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! RAM-backed flash model used by host tests and the simulated device.
//!
//! Behaves like NOR flash: erase sets whole sectors to 0xFF and programming
//! can only clear bits.

use crate::dispatch::{Flash, FlashError};
use crate::protocol::FLASH_SECTOR_SIZE;

pub struct RamFlash<const N: usize> {
    base: u32,
    sector_size: u32,
    mem: [u8; N],
    fail_erase: bool,
    fail_write: bool,
    erase_calls: usize,
    write_calls: usize,
}

impl<const N: usize> RamFlash<N> {
    /// Erased flash mapped at `base`, with the default sector size.
    pub fn new(base: u32) -> Self {
        Self::with_sector_size(base, FLASH_SECTOR_SIZE)
    }

    pub fn with_sector_size(base: u32, sector_size: u32) -> Self {
        Self {
            base,
            sector_size,
            mem: [0xFF; N],
            fail_erase: false,
            fail_write: false,
            erase_calls: 0,
            write_calls: 0,
        }
    }

    /// Make every following erase fail.
    pub fn fail_erase(&mut self, fail: bool) {
        self.fail_erase = fail;
    }

    /// Make every following write fail with `FlashError::Verify`.
    pub fn fail_write(&mut self, fail: bool) {
        self.fail_write = fail;
    }

    pub fn erase_calls(&self) -> usize {
        self.erase_calls
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    /// Raw contents starting at `addr`, for assertions.
    pub fn contents(&self, addr: u32, len: usize) -> &[u8] {
        let start = (addr - self.base) as usize;
        &self.mem[start..start + len]
    }

    fn offset_range(&self, addr: u32, len: usize) -> Result<(usize, usize), FlashError> {
        if addr < self.base {
            return Err(FlashError::OutOfRange);
        }
        let start = (addr - self.base) as usize;
        let end = start.checked_add(len).ok_or(FlashError::OutOfRange)?;
        if end > N {
            return Err(FlashError::OutOfRange);
        }
        Ok((start, end))
    }
}

impl<const N: usize> Flash for RamFlash<N> {
    fn erase(&mut self, addr: u32, len: u32) -> Result<(), FlashError> {
        self.erase_calls += 1;
        let (start, end) = self.offset_range(addr, len as usize)?;
        if self.fail_erase {
            return Err(FlashError::Verify);
        }

        let sector = self.sector_size as usize;
        let first = start - start % sector;
        let last = end.div_ceil(sector) * sector;
        self.mem[first..last.min(N)].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashError> {
        self.write_calls += 1;
        let (start, end) = self.offset_range(addr, data.len())?;
        if self.fail_write {
            return Err(FlashError::Verify);
        }

        for (cell, &byte) in self.mem[start..end].iter_mut().zip(data) {
            *cell &= byte;
        }
        Ok(())
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let (start, end) = self.offset_range(addr, buf.len())?;
        buf.copy_from_slice(&self.mem[start..end]);
        Ok(())
    }
}

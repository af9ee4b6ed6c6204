// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash read/write/erase wrappers using RP2040 ROM routines.
//!
//! On RP2040, flash operations (erase/program) require disabling XIP first.
//! The full sequence is:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code executing during steps 1-5 must run from RAM, not flash.
//! We use `#[link_section = ".data"]` to place critical functions in RAM,
//! and pre-resolve all ROM function pointers at init time.

use serboot_common::protocol::{FLASH_BASE, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, FLASH_SIZE};
use serboot_common::{BootDescriptor, Flash, FlashError, BOOT_DESCRIPTOR_SIZE};

// ROM function pointer types
type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

/// ROM function pointers, resolved once at init from the ROM table.
/// Stored in static RAM so RAM-resident functions can call them without
/// accessing flash-based code.
static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// SPI sector erase (4K), paired with a 4K block size in `flash_range_erase`.
const SECTOR_ERASE_CMD: u8 = 0x20;

/// Look up a ROM function by its two-character tag.
/// ROM table pointer at 0x14 and lookup function at 0x18 are 16-bit halfword pointers.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

/// Erase flash at the given flash-relative offset.
///
/// # Safety
/// ROM pointers must be resolved (`Rp2040Flash::new`).
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_erase(offset: u32, size: u32) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(offset, size as usize, FLASH_SECTOR_SIZE, SECTOR_ERASE_CMD);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// Program flash at the given flash-relative offset.
///
/// # Safety
/// ROM pointers must be resolved (`Rp2040Flash::new`).
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_program(offset: u32, data: *const u8, len: usize) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, len);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// Read bytes from an absolute XIP flash address via volatile reads.
fn flash_read(abs_addr: u32, buf: &mut [u8]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = unsafe { ((abs_addr + i as u32) as *const u8).read_volatile() };
    }
}

/// Check `[addr, addr + len)` lies in the XIP window and return its offset.
fn to_offset(addr: u32, len: u32) -> Result<u32, FlashError> {
    let end = addr.checked_add(len).ok_or(FlashError::OutOfRange)?;
    if addr < FLASH_BASE || end > FLASH_BASE + FLASH_SIZE {
        return Err(FlashError::OutOfRange);
    }
    Ok(addr - FLASH_BASE)
}

/// On-chip QSPI flash driven through the boot ROM.
pub struct Rp2040Flash {
    _private: (),
}

impl Rp2040Flash {
    /// Resolve the ROM flash routines.
    /// This performs ROM table lookups which require XIP to be active.
    pub fn new() -> Self {
        unsafe {
            ROM_CONNECT_INTERNAL_FLASH =
                core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
            ROM_FLASH_EXIT_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
            ROM_FLASH_RANGE_ERASE =
                core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
            ROM_FLASH_RANGE_PROGRAM =
                core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
            ROM_FLASH_FLUSH_CACHE =
                core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
            ROM_FLASH_ENTER_CMD_XIP =
                core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
        }
        Self { _private: () }
    }
}

impl Flash for Rp2040Flash {
    fn erase(&mut self, addr: u32, len: u32) -> Result<(), FlashError> {
        let offset = to_offset(addr, len)?;

        // Widen to whole sectors
        let start = offset - offset % FLASH_SECTOR_SIZE;
        let end = (offset + len).div_ceil(FLASH_SECTOR_SIZE) * FLASH_SECTOR_SIZE;
        if end > FLASH_SIZE {
            return Err(FlashError::OutOfRange);
        }

        unsafe { flash_erase(start, end - start) };
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashError> {
        let offset = to_offset(addr, data.len() as u32)?;
        let page_size = FLASH_PAGE_SIZE as usize;

        // Program whole pages, padding with erased bytes around `data`.
        let mut page = [0xFFu8; FLASH_PAGE_SIZE as usize];
        let mut pos = 0usize;
        while pos < data.len() {
            let cur = offset as usize + pos;
            let page_start = cur - cur % page_size;
            let in_page = cur - page_start;
            let n = (page_size - in_page).min(data.len() - pos);

            page.fill(0xFF);
            page[in_page..in_page + n].copy_from_slice(&data[pos..pos + n]);
            unsafe { flash_program(page_start as u32, page.as_ptr(), page.len()) };

            pos += n;
        }

        // Read back through XIP
        let mut chunk = [0u8; 64];
        for (i, expected) in data.chunks(chunk.len()).enumerate() {
            let got = &mut chunk[..expected.len()];
            flash_read(addr + (i * 64) as u32, got);
            if got != expected {
                return Err(FlashError::Verify);
            }
        }
        Ok(())
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        to_offset(addr, buf.len() as u32)?;
        flash_read(addr, buf);
        Ok(())
    }
}

/// Read the boot descriptor left by the last successful VERIFY.
pub fn read_boot_descriptor(addr: u32) -> Option<BootDescriptor> {
    let mut raw = [0u8; BOOT_DESCRIPTOR_SIZE];
    flash_read(addr, &mut raw);
    BootDescriptor::parse(&raw)
}

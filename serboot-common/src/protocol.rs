// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Shared protocol types for bootloader <-> host communication.
//!
//! Wire format, both directions:
//!
//! ```text
//! | 0xAA | opcode | length (2) | payload (length) | crc16 (2) |
//! ```
//!
//! Multi-byte fields are little-endian. The CRC16 covers opcode, both length
//! bytes and the payload.

// --- Flash layout constants ---

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const FLASH_SIZE: u32 = 2 * 1024 * 1024;

pub const BOOTLOADER_ADDR: u32 = FLASH_BASE;
pub const BOOTLOADER_SIZE: u32 = 48 * 1024;

pub const BOOT_DESCRIPTOR_ADDR: u32 = 0x1000_C000;
pub const BOOT_DESCRIPTOR_REGION_SIZE: u32 = 16 * 1024;

pub const APP_ADDR: u32 = 0x1001_0000;
pub const APP_REGION_SIZE: u32 = 448 * 1024;
pub const APP_REGION_END: u32 = APP_ADDR + APP_REGION_SIZE;

pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PAGE_SIZE: u32 = 256;

// --- Framing constants ---

/// Sentinel byte that starts every frame.
pub const FRAME_HEADER: u8 = 0xAA;

/// Largest payload a frame may declare.
pub const PACKET_PAYLOAD_MAX_LENGTH: usize = 4096;

/// Header, opcode, two length bytes and two CRC bytes.
pub const FRAME_OVERHEAD: usize = 1 + 1 + 2 + 2;

pub const PACKET_MAX_LENGTH: usize = FRAME_OVERHEAD + PACKET_PAYLOAD_MAX_LENGTH;

/// Inactivity window after which a partial frame is dropped.
pub const PACKET_RECV_BYTE_TIMEOUT_MS: u64 = 2000;

/// Address + size prefix carried by ERASE, WRITE and VERIFY.
pub const RANGE_PARAM_LEN: usize = 8;

/// Address + size + crc32 carried by VERIFY.
pub const VERIFY_PARAM_LEN: usize = 12;

pub const BOOTLOADER_VERSION_MAJOR: u8 = 1;
pub const BOOTLOADER_VERSION_MINOR: u8 = 0;

// --- Opcodes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    Inquiry = 0x10,
    Boot = 0x11,
    Reset = 0x1F,
    Erase = 0x20,
    /// Accepted by the framer, not served by the dispatcher.
    Read = 0x21,
    Write = 0x22,
    Verify = 0x23,
}

impl Opcode {
    pub const ALL: [Opcode; 7] = [
        Opcode::Inquiry,
        Opcode::Boot,
        Opcode::Reset,
        Opcode::Erase,
        Opcode::Read,
        Opcode::Write,
        Opcode::Verify,
    ];

    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| *op as u8 == byte)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_u8(byte).ok_or(byte)
    }
}

// --- Error codes ---

/// One-byte status carried by every ack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ErrorCode {
    Ok = 0x00,
    Opcode = 0x01,
    /// Reserved, never sent.
    Overflow = 0x02,
    Format = 0x03,
    Verify = 0x04,
    Param = 0x05,
    /// Reserved, never sent. Partial frames time out silently.
    Timeout = 0x06,
    Unknown = 0xFF,
}

impl ErrorCode {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(ErrorCode::Ok),
            0x01 => Some(ErrorCode::Opcode),
            0x02 => Some(ErrorCode::Overflow),
            0x03 => Some(ErrorCode::Format),
            0x04 => Some(ErrorCode::Verify),
            0x05 => Some(ErrorCode::Param),
            0x06 => Some(ErrorCode::Timeout),
            0xFF => Some(ErrorCode::Unknown),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == ErrorCode::Ok
    }
}

// --- Inquiry parameters ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum InquiryParam {
    Version = 0x00,
    Mtu = 0x01,
}

impl InquiryParam {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(InquiryParam::Version),
            0x01 => Some(InquiryParam::Mtu),
            _ => None,
        }
    }
}

// --- Application region ---

/// Flash window remote commands are allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppRegion {
    pub start: u32,
    pub end: u32,
}

impl AppRegion {
    pub const DEFAULT: AppRegion = AppRegion {
        start: APP_ADDR,
        end: APP_REGION_END,
    };

    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// True if `[address, address + size)` is non-empty and lies inside the region.
    pub fn contains(&self, address: u32, size: u32) -> bool {
        if size == 0 || address < self.start {
            return false;
        }
        match address.checked_add(size) {
            Some(end) => end <= self.end,
            None => false,
        }
    }

    pub fn size(&self) -> u32 {
        self.end - self.start
    }
}

// Compile-time layout checks
const _: () = assert!(BOOT_DESCRIPTOR_ADDR >= BOOTLOADER_ADDR + BOOTLOADER_SIZE);
const _: () = assert!(APP_ADDR >= BOOT_DESCRIPTOR_ADDR + BOOT_DESCRIPTOR_REGION_SIZE);
const _: () = assert!(APP_REGION_END <= FLASH_BASE + FLASH_SIZE);
const _: () = assert!(APP_ADDR % FLASH_SECTOR_SIZE == 0);
const _: () = assert!(BOOT_DESCRIPTOR_ADDR % FLASH_SECTOR_SIZE == 0);

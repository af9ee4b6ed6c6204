// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot descriptor: the record of the last verified application image.

pub const BOOT_DESCRIPTOR_MAGIC: u32 = 0x1A2B_3C4D;

/// Size of the persisted record in bytes.
pub const BOOT_DESCRIPTOR_SIZE: usize = 16;

// --- BootDescriptor (16 bytes, little-endian on flash) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootDescriptor {
    pub magic: u32,
    pub address: u32,
    pub length: u32,
    pub crc32: u32,
}

impl BootDescriptor {
    pub fn new(address: u32, length: u32, crc32: u32) -> Self {
        Self {
            magic: BOOT_DESCRIPTOR_MAGIC,
            address,
            length,
            crc32,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == BOOT_DESCRIPTOR_MAGIC
    }

    pub fn to_bytes(&self) -> [u8; BOOT_DESCRIPTOR_SIZE] {
        let mut out = [0u8; BOOT_DESCRIPTOR_SIZE];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.address.to_le_bytes());
        out[8..12].copy_from_slice(&self.length.to_le_bytes());
        out[12..16].copy_from_slice(&self.crc32.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; BOOT_DESCRIPTOR_SIZE]) -> Self {
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            magic: word(0),
            address: word(4),
            length: word(8),
            crc32: word(12),
        }
    }

    /// Decode a record and keep it only if the magic matches.
    pub fn parse(bytes: &[u8; BOOT_DESCRIPTOR_SIZE]) -> Option<Self> {
        let bd = Self::from_bytes(bytes);
        bd.is_valid().then_some(bd)
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Frame and image checksums.

use crc::{Crc, CRC_16_MODBUS, CRC_32_ISO_HDLC};

/// Frame checksum (CRC-16/MODBUS).
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Image checksum (CRC-32/ISO-HDLC), same as zlib.
pub const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for protocol types, constants and the boot descriptor.

use serboot_common::descriptor::{BootDescriptor, BOOT_DESCRIPTOR_MAGIC, BOOT_DESCRIPTOR_SIZE};
use serboot_common::protocol::{
    AppRegion, ErrorCode, InquiryParam, Opcode, APP_ADDR, APP_REGION_END, APP_REGION_SIZE,
    BOOTLOADER_SIZE, BOOT_DESCRIPTOR_ADDR, FLASH_BASE, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE,
    FLASH_SIZE, FRAME_HEADER, PACKET_MAX_LENGTH, PACKET_PAYLOAD_MAX_LENGTH,
    PACKET_RECV_BYTE_TIMEOUT_MS,
};
use serboot_common::BootConfig;

// --- Flash layout constants tests ---

#[test]
fn test_flash_base_address() {
    assert_eq!(FLASH_BASE, 0x1000_0000);
    assert_eq!(FLASH_SIZE, 2 * 1024 * 1024);
}

#[test]
fn test_app_region_addresses() {
    assert_eq!(APP_ADDR, 0x1001_0000);
    assert_eq!(APP_REGION_SIZE, 448 * 1024);
    assert_eq!(APP_REGION_END, 0x1008_0000);
}

#[test]
fn test_boot_descriptor_address() {
    assert_eq!(BOOT_DESCRIPTOR_ADDR, 0x1000_C000);
}

#[test]
fn test_flash_sizes() {
    assert_eq!(FLASH_SECTOR_SIZE, 4096);
    assert_eq!(FLASH_PAGE_SIZE, 256);
}

#[test]
fn test_framing_constants() {
    assert_eq!(FRAME_HEADER, 0xAA);
    assert_eq!(PACKET_PAYLOAD_MAX_LENGTH, 4096);
    assert_eq!(PACKET_MAX_LENGTH, 4096 + 6);
    assert_eq!(PACKET_RECV_BYTE_TIMEOUT_MS, 2000);
}

// --- Memory layout validation ---

#[test]
fn test_descriptor_sits_after_bootloader() {
    assert!(BOOT_DESCRIPTOR_ADDR >= FLASH_BASE + BOOTLOADER_SIZE);
}

#[test]
fn test_app_region_does_not_overlap_descriptor() {
    assert!(APP_ADDR > BOOT_DESCRIPTOR_ADDR);
    assert!(!AppRegion::DEFAULT.contains(BOOT_DESCRIPTOR_ADDR, BOOT_DESCRIPTOR_SIZE as u32));
}

#[test]
fn test_regions_sector_aligned() {
    assert_eq!(APP_ADDR % FLASH_SECTOR_SIZE, 0);
    assert_eq!(APP_REGION_END % FLASH_SECTOR_SIZE, 0);
    assert_eq!(BOOT_DESCRIPTOR_ADDR % FLASH_SECTOR_SIZE, 0);
}

// --- Opcode tests ---

#[test]
fn test_opcode_values() {
    assert_eq!(Opcode::Inquiry.as_u8(), 0x10);
    assert_eq!(Opcode::Boot.as_u8(), 0x11);
    assert_eq!(Opcode::Reset.as_u8(), 0x1F);
    assert_eq!(Opcode::Erase.as_u8(), 0x20);
    assert_eq!(Opcode::Read.as_u8(), 0x21);
    assert_eq!(Opcode::Write.as_u8(), 0x22);
    assert_eq!(Opcode::Verify.as_u8(), 0x23);
}

#[test]
fn test_opcode_from_u8_round_trips_known_values() {
    for op in Opcode::ALL {
        assert_eq!(Opcode::from_u8(op.as_u8()), Some(op));
        assert_eq!(Opcode::try_from(op.as_u8()), Ok(op));
    }
}

#[test]
fn test_opcode_rejects_unknown_values() {
    let known: Vec<u8> = Opcode::ALL.iter().map(|op| op.as_u8()).collect();
    for byte in 0..=255u8 {
        if !known.contains(&byte) {
            assert_eq!(Opcode::from_u8(byte), None);
            assert_eq!(Opcode::try_from(byte), Err(byte));
        }
    }
}

// --- ErrorCode tests ---

#[test]
fn test_error_code_wire_values() {
    assert_eq!(ErrorCode::Ok.as_u8(), 0x00);
    assert_eq!(ErrorCode::Opcode.as_u8(), 0x01);
    assert_eq!(ErrorCode::Overflow.as_u8(), 0x02);
    assert_eq!(ErrorCode::Format.as_u8(), 0x03);
    assert_eq!(ErrorCode::Verify.as_u8(), 0x04);
    assert_eq!(ErrorCode::Param.as_u8(), 0x05);
    assert_eq!(ErrorCode::Timeout.as_u8(), 0x06);
    assert_eq!(ErrorCode::Unknown.as_u8(), 0xFF);
}

#[test]
fn test_error_code_from_u8() {
    assert_eq!(ErrorCode::from_u8(0x05), Some(ErrorCode::Param));
    assert_eq!(ErrorCode::from_u8(0x07), None);
    assert!(ErrorCode::Ok.is_ok());
    assert!(!ErrorCode::Verify.is_ok());
}

#[test]
fn test_inquiry_params() {
    assert_eq!(InquiryParam::from_u8(0x00), Some(InquiryParam::Version));
    assert_eq!(InquiryParam::from_u8(0x01), Some(InquiryParam::Mtu));
    assert_eq!(InquiryParam::from_u8(0x02), None);
}

// --- AppRegion tests ---

#[test]
fn test_app_region_contains_bounds() {
    let region = AppRegion::new(0x1000, 0x2000);
    assert!(region.contains(0x1000, 0x1000));
    assert!(region.contains(0x1FFF, 1));
    assert!(!region.contains(0x0FFF, 2));
    assert!(!region.contains(0x1FFF, 2));
    assert!(!region.contains(0x1000, 0));
    assert_eq!(region.size(), 0x1000);
}

#[test]
fn test_app_region_rejects_wrapping_range() {
    let region = AppRegion::new(0x1000, u32::MAX);
    assert!(!region.contains(0xFFFF_FF00, 0x200));
}

// --- BootConfig tests ---

#[test]
fn test_default_config_matches_layout() {
    let config = BootConfig::default();
    assert_eq!(config.app_region, AppRegion::DEFAULT);
    assert_eq!(config.app_entry(), APP_ADDR);
    assert_eq!(config.descriptor_addr, BOOT_DESCRIPTOR_ADDR);
    assert_eq!(config.byte_timeout_ms, PACKET_RECV_BYTE_TIMEOUT_MS);
    assert_eq!((config.version_major, config.version_minor), (1, 0));
}

// --- BootDescriptor tests ---

#[test]
fn test_boot_descriptor_layout_is_little_endian() {
    let bd = BootDescriptor::new(0x1001_0000, 0x0000_1234, 0xDEAD_BEEF);
    let bytes = bd.to_bytes();
    assert_eq!(bytes.len(), BOOT_DESCRIPTOR_SIZE);
    assert_eq!(&bytes[0..4], &BOOT_DESCRIPTOR_MAGIC.to_le_bytes());
    assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x01, 0x10]);
    assert_eq!(&bytes[8..12], &[0x34, 0x12, 0x00, 0x00]);
    assert_eq!(&bytes[12..16], &[0xEF, 0xBE, 0xAD, 0xDE]);
}

#[test]
fn test_boot_descriptor_from_bytes() {
    let bd = BootDescriptor::new(APP_ADDR, 4096, 0x1234_5678);
    assert_eq!(BootDescriptor::from_bytes(&bd.to_bytes()), bd);
    assert!(bd.is_valid());
}

#[test]
fn test_erased_descriptor_is_not_parsed() {
    assert_eq!(BootDescriptor::parse(&[0xFF; BOOT_DESCRIPTOR_SIZE]), None);
    assert!(!BootDescriptor::from_bytes(&[0xFF; BOOT_DESCRIPTOR_SIZE]).is_valid());
}

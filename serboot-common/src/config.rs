// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Runtime parameters of the protocol engine.

use crate::protocol::{
    AppRegion, BOOTLOADER_VERSION_MAJOR, BOOTLOADER_VERSION_MINOR, BOOT_DESCRIPTOR_ADDR,
    PACKET_RECV_BYTE_TIMEOUT_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootConfig {
    /// Range ERASE, WRITE and VERIFY may address. Its start is also the
    /// application entry used by BOOT.
    pub app_region: AppRegion,
    /// Where VERIFY persists the boot descriptor.
    pub descriptor_addr: u32,
    pub byte_timeout_ms: u64,
    pub version_major: u8,
    pub version_minor: u8,
}

impl BootConfig {
    pub const DEFAULT: BootConfig = BootConfig {
        app_region: AppRegion::DEFAULT,
        descriptor_addr: BOOT_DESCRIPTOR_ADDR,
        byte_timeout_ms: PACKET_RECV_BYTE_TIMEOUT_MS,
        version_major: BOOTLOADER_VERSION_MAJOR,
        version_minor: BOOTLOADER_VERSION_MINOR,
    };

    pub fn app_entry(&self) -> u32 {
        self.app_region.start
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

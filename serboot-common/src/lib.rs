// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Protocol core for the serboot serial bootloader.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for the bootloader firmware
//! - `std` feature: Vec-returning frame encoder for host tools
//! - `defmt` feature: `defmt::Format` on the public types

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod checksum;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod frame;
pub mod protocol;
pub mod queue;
pub mod ram_flash;
pub mod reader;
pub mod session;

// Re-export commonly used types
pub use config::BootConfig;
pub use descriptor::{BootDescriptor, BOOT_DESCRIPTOR_MAGIC, BOOT_DESCRIPTOR_SIZE};
pub use dispatch::{Action, Dispatch, Dispatcher, Flash, FlashError, Reply, Transmit};
pub use frame::{Feed, Frame, FrameAssembler, FrameError};
pub use protocol::{AppRegion, ErrorCode, InquiryParam, Opcode};
pub use protocol::{APP_ADDR, APP_REGION_END, BOOT_DESCRIPTOR_ADDR, FLASH_BASE};
pub use protocol::{FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, PACKET_PAYLOAD_MAX_LENGTH};
pub use queue::{ByteQueue, Consumer, Producer};
pub use session::{Event, Session};

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command dispatcher: turns a validated frame into flash operations and
//! exactly one response frame.
//!
//! This module implements the request handlers:
//! - INQUIRY: report version or MTU
//! - BOOT / RESET: ack, then hand the irreversible action back to the caller
//! - ERASE / WRITE: range-checked flash mutation
//! - VERIFY: CRC32 over live flash, persisting the boot descriptor on match
//!
//! BOOT and RESET never return on hardware. The dispatcher only acks them and
//! reports the action in `Dispatch::action`, the main loop performs it.

use crate::checksum::CRC32;
use crate::config::BootConfig;
use crate::descriptor::{BootDescriptor, BOOT_DESCRIPTOR_SIZE};
use crate::frame::{encode_heapless, encoded_len, Frame};
use crate::protocol::{
    ErrorCode, InquiryParam, Opcode, PACKET_PAYLOAD_MAX_LENGTH, RANGE_PARAM_LEN, VERIFY_PARAM_LEN,
};
use crate::reader::FieldReader;

/// Flash collaborator. Addresses are absolute.
pub trait Flash {
    /// Erase every sector overlapping `[addr, addr + len)`.
    fn erase(&mut self, addr: u32, len: u32) -> Result<(), FlashError>;

    /// Program `data` at `addr`. The target must be erased. Implementations
    /// that program in larger units pad with erased (0xFF) bytes.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashError>;

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError>;
}

/// Blocking transmit collaborator.
pub trait Transmit {
    fn send(&mut self, bytes: &[u8]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    OutOfRange,
    /// Read-back after programming did not match.
    Verify,
}

/// Response frame sent for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    Ack(ErrorCode),
    Version { major: u8, minor: u8 },
    Mtu(u16),
}

impl Reply {
    /// Write the response payload into `buf`, returning its length.
    pub fn encode_payload(&self, buf: &mut [u8; 2]) -> usize {
        match *self {
            Reply::Ack(code) => {
                buf[0] = code.as_u8();
                1
            }
            Reply::Version { major, minor } => {
                buf[0] = major;
                buf[1] = minor;
                2
            }
            Reply::Mtu(mtu) => {
                *buf = mtu.to_le_bytes();
                2
            }
        }
    }
}

/// What the main loop must do after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    Continue,
    /// Shut down peripherals and jump to the application vector table at `entry`.
    Boot { entry: u32 },
    /// Disable interrupts and reset the system.
    Reset,
}

/// Record of one handled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dispatch {
    pub opcode: Opcode,
    pub reply: Option<Reply>,
    pub action: Action,
    /// Set when VERIFY matched and tried to persist the boot descriptor.
    pub descriptor: Option<Result<BootDescriptor, FlashError>>,
}

impl Dispatch {
    fn reply(opcode: Opcode, reply: Reply) -> Self {
        Self {
            opcode,
            reply: Some(reply),
            action: Action::Continue,
            descriptor: None,
        }
    }

    fn ack(opcode: Opcode, code: ErrorCode) -> Self {
        Self::reply(opcode, Reply::Ack(code))
    }

    fn silent(opcode: Opcode) -> Self {
        Self {
            opcode,
            reply: None,
            action: Action::Continue,
            descriptor: None,
        }
    }
}

/// Compute CRC-32 (ISO HDLC) over flash contents.
pub fn flash_crc32<F: Flash>(flash: &mut F, address: u32, size: u32) -> Result<u32, FlashError> {
    let mut digest = CRC32.digest();
    let mut remaining = size as usize;
    let mut addr = address;
    let mut chunk = [0u8; 256];

    while remaining > 0 {
        let n = remaining.min(chunk.len());
        flash.read(addr, &mut chunk[..n])?;
        digest.update(&chunk[..n]);
        addr += n as u32;
        remaining -= n;
    }

    Ok(digest.finalize())
}

pub struct Dispatcher {
    config: BootConfig,
}

impl Dispatcher {
    pub const fn new(config: BootConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    /// Handle one frame and send its response.
    pub fn dispatch<F: Flash, T: Transmit>(
        &self,
        frame: &Frame<'_>,
        flash: &mut F,
        tx: &mut T,
    ) -> Dispatch {
        let (mut result, verified) = match frame.opcode() {
            Opcode::Verify => self.handle_verify(frame, flash),
            Opcode::Inquiry => (self.handle_inquiry(frame), None),
            Opcode::Boot => {
                let result = Dispatch {
                    action: Action::Boot {
                        entry: self.config.app_entry(),
                    },
                    ..Dispatch::ack(Opcode::Boot, ErrorCode::Ok)
                };
                (result, None)
            }
            Opcode::Reset => {
                let result = Dispatch {
                    action: Action::Reset,
                    ..Dispatch::ack(Opcode::Reset, ErrorCode::Ok)
                };
                (result, None)
            }
            Opcode::Erase => (self.handle_erase(frame, flash), None),
            Opcode::Write => (self.handle_write(frame, flash), None),
            other => (Dispatch::ack(other, ErrorCode::Opcode), None),
        };

        if let Some(reply) = result.reply {
            send_reply(tx, result.opcode, reply);
        }

        // The descriptor is only touched after the VERIFY ack is out.
        if let Some(bd) = verified {
            result.descriptor = Some(self.persist_descriptor(flash, &bd).map(|()| bd));
        }

        result
    }

    fn handle_inquiry(&self, frame: &Frame<'_>) -> Dispatch {
        let param = frame.payload().first().copied().and_then(InquiryParam::from_u8);
        match param {
            Some(InquiryParam::Version) => Dispatch::reply(
                Opcode::Inquiry,
                Reply::Version {
                    major: self.config.version_major,
                    minor: self.config.version_minor,
                },
            ),
            Some(InquiryParam::Mtu) => {
                Dispatch::reply(Opcode::Inquiry, Reply::Mtu(PACKET_PAYLOAD_MAX_LENGTH as u16))
            }
            None => Dispatch::silent(Opcode::Inquiry),
        }
    }

    fn handle_erase<F: Flash>(&self, frame: &Frame<'_>, flash: &mut F) -> Dispatch {
        if frame.len() != RANGE_PARAM_LEN {
            return Dispatch::ack(Opcode::Erase, ErrorCode::Format);
        }
        let Some((address, size)) = read_range(&mut FieldReader::new(frame.payload())) else {
            return Dispatch::ack(Opcode::Erase, ErrorCode::Format);
        };
        if !self.config.app_region.contains(address, size) {
            return Dispatch::ack(Opcode::Erase, ErrorCode::Param);
        }

        match flash.erase(address, size) {
            Ok(()) => Dispatch::ack(Opcode::Erase, ErrorCode::Ok),
            Err(_) => Dispatch::ack(Opcode::Erase, ErrorCode::Unknown),
        }
    }

    fn handle_write<F: Flash>(&self, frame: &Frame<'_>, flash: &mut F) -> Dispatch {
        if frame.len() <= RANGE_PARAM_LEN {
            return Dispatch::ack(Opcode::Write, ErrorCode::Format);
        }
        let mut reader = FieldReader::new(frame.payload());
        let Some((address, size)) = read_range(&mut reader) else {
            return Dispatch::ack(Opcode::Write, ErrorCode::Format);
        };
        if !self.config.app_region.contains(address, size) {
            return Dispatch::ack(Opcode::Write, ErrorCode::Param);
        }
        let Some(data) = reader.rest().get(..size as usize) else {
            return Dispatch::ack(Opcode::Write, ErrorCode::Format);
        };

        match flash.write(address, data) {
            Ok(()) => Dispatch::ack(Opcode::Write, ErrorCode::Ok),
            Err(_) => Dispatch::ack(Opcode::Write, ErrorCode::Unknown),
        }
    }

    /// Returns the descriptor to persist when the image matched.
    fn handle_verify<F: Flash>(
        &self,
        frame: &Frame<'_>,
        flash: &mut F,
    ) -> (Dispatch, Option<BootDescriptor>) {
        let fail = |code| (Dispatch::ack(Opcode::Verify, code), None);

        if frame.len() != VERIFY_PARAM_LEN {
            return fail(ErrorCode::Format);
        }
        let mut reader = FieldReader::new(frame.payload());
        let Some((address, size)) = read_range(&mut reader) else {
            return fail(ErrorCode::Format);
        };
        let Some(expected) = reader.read_u32_le() else {
            return fail(ErrorCode::Format);
        };
        if !self.config.app_region.contains(address, size) {
            return fail(ErrorCode::Param);
        }

        let actual = match flash_crc32(flash, address, size) {
            Ok(crc) => crc,
            Err(_) => return fail(ErrorCode::Unknown),
        };
        if actual != expected {
            return fail(ErrorCode::Verify);
        }

        (
            Dispatch::ack(Opcode::Verify, ErrorCode::Ok),
            Some(BootDescriptor::new(address, size, expected)),
        )
    }

    fn persist_descriptor<F: Flash>(
        &self,
        flash: &mut F,
        bd: &BootDescriptor,
    ) -> Result<(), FlashError> {
        let addr = self.config.descriptor_addr;
        flash.erase(addr, BOOT_DESCRIPTOR_SIZE as u32)?;
        flash.write(addr, &bd.to_bytes())
    }
}

fn read_range(reader: &mut FieldReader<'_>) -> Option<(u32, u32)> {
    let address = reader.read_u32_le()?;
    let size = reader.read_u32_le()?;
    Some((address, size))
}

fn send_reply<T: Transmit>(tx: &mut T, opcode: Opcode, reply: Reply) {
    let mut payload = [0u8; 2];
    let len = reply.encode_payload(&mut payload);
    if let Some(frame) = encode_heapless::<{ encoded_len(2) }>(opcode.as_u8(), &payload[..len]) {
        tx.send(&frame);
    }
}

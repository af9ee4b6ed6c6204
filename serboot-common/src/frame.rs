// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Byte-at-a-time frame assembler and the matching frame encoder.
//!
//! The assembler owns a single fixed buffer large enough for the largest
//! legal frame. It never grows past `PACKET_MAX_LENGTH`: oversize lengths are
//! rejected as soon as both length bytes have arrived.

#[cfg(feature = "std")]
extern crate alloc;

#[cfg(feature = "std")]
use alloc::vec::Vec;

use heapless::Vec as HeaplessVec;

use crate::checksum::CRC16;
use crate::protocol::{Opcode, FRAME_HEADER, FRAME_OVERHEAD, PACKET_MAX_LENGTH, PACKET_PAYLOAD_MAX_LENGTH};

/// Offset of the first payload byte in the frame buffer.
const PAYLOAD_OFFSET: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssemblerState {
    AwaitHeader,
    AwaitOpcode,
    AwaitLength,
    AwaitPayload,
    AwaitCrc,
}

/// Why a partial frame was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    UnknownOpcode(u8),
    Oversize(u16),
    CrcMismatch { received: u16, computed: u16 },
}

/// Result of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Feed {
    /// No complete frame yet (this includes silently skipped non-header bytes).
    InProgress,
    /// A CRC-valid frame is available through `FrameAssembler::frame`.
    Complete,
    /// The partial frame was dropped and the assembler reset.
    Discarded(FrameError),
}

/// A validated frame, borrowed from the assembler buffer.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    opcode: Opcode,
    payload: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(opcode: Opcode, payload: &'a [u8]) -> Self {
        Self { opcode, payload }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

pub struct FrameAssembler {
    buf: [u8; PACKET_MAX_LENGTH],
    index: usize,
    state: AssemblerState,
    length: u16,
    field_len: u16,
    complete: bool,
}

impl FrameAssembler {
    pub const fn new() -> Self {
        Self {
            buf: [0; PACKET_MAX_LENGTH],
            index: 0,
            state: AssemblerState::AwaitHeader,
            length: 0,
            field_len: 0,
            complete: false,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Bytes stored for the current frame.
    pub fn index(&self) -> usize {
        self.index
    }

    /// True once a header byte has been accepted and until the next reset.
    pub fn in_progress(&self) -> bool {
        self.state != AssemblerState::AwaitHeader
    }

    /// Drop whatever is buffered and wait for a header byte.
    pub fn reset(&mut self) {
        self.index = 0;
        self.state = AssemblerState::AwaitHeader;
        self.length = 0;
        self.field_len = 0;
        self.complete = false;
    }

    /// The completed frame, if the last `feed` returned `Feed::Complete`.
    pub fn frame(&self) -> Option<Frame<'_>> {
        if !self.complete {
            return None;
        }
        let opcode = Opcode::from_u8(self.buf[1])?;
        let end = PAYLOAD_OFFSET + self.length as usize;
        Some(Frame::new(opcode, &self.buf[PAYLOAD_OFFSET..end]))
    }

    pub fn feed(&mut self, byte: u8) -> Feed {
        if self.complete {
            self.reset();
        }

        self.buf[self.index] = byte;
        self.index += 1;

        match self.state {
            AssemblerState::AwaitHeader => {
                if byte == FRAME_HEADER {
                    self.state = AssemblerState::AwaitOpcode;
                } else {
                    self.reset();
                }
                Feed::InProgress
            }
            AssemblerState::AwaitOpcode => {
                if Opcode::from_u8(byte).is_some() {
                    self.state = AssemblerState::AwaitLength;
                    Feed::InProgress
                } else {
                    self.discard(FrameError::UnknownOpcode(byte))
                }
            }
            AssemblerState::AwaitLength => {
                self.field_len += 1;
                if self.field_len < 2 {
                    return Feed::InProgress;
                }
                self.field_len = 0;
                // First length byte on the wire is the low byte.
                let length = u16::from_le_bytes([self.buf[2], self.buf[3]]);
                if length as usize > PACKET_PAYLOAD_MAX_LENGTH {
                    return self.discard(FrameError::Oversize(length));
                }
                self.length = length;
                self.state = if length == 0 {
                    AssemblerState::AwaitCrc
                } else {
                    AssemblerState::AwaitPayload
                };
                Feed::InProgress
            }
            AssemblerState::AwaitPayload => {
                self.field_len += 1;
                if self.field_len == self.length {
                    self.field_len = 0;
                    self.state = AssemblerState::AwaitCrc;
                }
                Feed::InProgress
            }
            AssemblerState::AwaitCrc => {
                self.field_len += 1;
                if self.field_len < 2 {
                    return Feed::InProgress;
                }
                self.field_len = 0;
                let received = u16::from_le_bytes([self.buf[self.index - 2], self.buf[self.index - 1]]);
                let computed = CRC16.checksum(&self.buf[1..self.index - 2]);
                if received == computed {
                    self.complete = true;
                    Feed::Complete
                } else {
                    self.discard(FrameError::CrcMismatch { received, computed })
                }
            }
        }
    }

    fn discard(&mut self, err: FrameError) -> Feed {
        self.reset();
        Feed::Discarded(err)
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

// --- Encoder ---

/// Encoded size of a frame carrying `payload_len` bytes.
pub const fn encoded_len(payload_len: usize) -> usize {
    FRAME_OVERHEAD + payload_len
}

/// Encode a frame into `out`, returning the number of bytes written.
///
/// Returns None if the payload is larger than the protocol allows or `out` is
/// too small.
pub fn encode_into(opcode: u8, payload: &[u8], out: &mut [u8]) -> Option<usize> {
    if payload.len() > PACKET_PAYLOAD_MAX_LENGTH {
        return None;
    }
    let total = encoded_len(payload.len());
    let out = out.get_mut(..total)?;

    let length = (payload.len() as u16).to_le_bytes();
    out[0] = FRAME_HEADER;
    out[1] = opcode;
    out[2] = length[0];
    out[3] = length[1];
    out[PAYLOAD_OFFSET..PAYLOAD_OFFSET + payload.len()].copy_from_slice(payload);

    let crc = CRC16.checksum(&out[1..total - 2]).to_le_bytes();
    out[total - 2] = crc[0];
    out[total - 1] = crc[1];

    Some(total)
}

/// Encode a frame into a heapless Vec (for no_std).
pub fn encode_heapless<const N: usize>(opcode: u8, payload: &[u8]) -> Option<HeaplessVec<u8, N>> {
    let mut output = HeaplessVec::new();
    output.resize(encoded_len(payload.len()), 0).ok()?;
    encode_into(opcode, payload, &mut output)?;
    Some(output)
}

#[cfg(feature = "std")]
/// Encode a frame into a Vec (for std).
///
/// Returns None if the payload exceeds `PACKET_PAYLOAD_MAX_LENGTH`.
pub fn encode(opcode: u8, payload: &[u8]) -> Option<Vec<u8>> {
    let mut output = alloc::vec![0u8; encoded_len(payload.len())];
    encode_into(opcode, payload, &mut output)?;
    Some(output)
}

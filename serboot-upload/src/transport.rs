// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport layer for bootloader communication.

use std::fmt;
use std::io::{self, Read, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serialport::SerialPort;

use serboot_common::frame::{self, Feed, FrameAssembler};
use serboot_common::protocol::{ErrorCode, Opcode};

/// Byte link to the device, with a read timeout.
pub trait Link: Read + Write {
    fn timeout(&self) -> Duration;
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
    fn name(&self) -> String;
}

impl Link for Box<dyn SerialPort> {
    fn timeout(&self) -> Duration {
        SerialPort::timeout(self.as_ref())
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        SerialPort::set_timeout(self.as_mut(), timeout).map_err(io::Error::from)
    }

    fn name(&self) -> String {
        SerialPort::name(self.as_ref()).unwrap_or_else(|| "?".to_string())
    }
}

/// A decoded response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

impl Response {
    /// Interpret the payload as a one-byte ack.
    pub fn ack_code(&self) -> Result<ErrorCode> {
        match self.payload.as_slice() {
            [byte] => ErrorCode::from_u8(*byte)
                .with_context(|| format!("Unknown error code 0x{:02x}", byte)),
            other => bail!("Expected a 1-byte ack, got {} bytes", other.len()),
        }
    }
}

/// The device answered a request with an error ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceError {
    pub opcode: Opcode,
    pub code: ErrorCode,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.code {
            ErrorCode::Ok => "ok",
            ErrorCode::Opcode => "opcode not supported",
            ErrorCode::Format => "malformed parameters",
            ErrorCode::Verify => "CRC mismatch",
            ErrorCode::Param => "address range outside the application region",
            ErrorCode::Unknown => "flash operation failed",
            ErrorCode::Overflow | ErrorCode::Timeout => "reserved error code",
        };
        write!(
            f,
            "{:?} rejected: {} (0x{:02x})",
            self.opcode,
            reason,
            self.code.as_u8()
        )
    }
}

impl std::error::Error for DeviceError {}

/// Framed request/response transport over a `Link`.
pub struct Transport<L: Link = Box<dyn SerialPort>> {
    link: L,
    assembler: Box<FrameAssembler>,
    verbose: bool,
}

impl Transport {
    /// Open a serial port, 8N1.
    pub fn open(port_name: &str, baud_rate: u32, timeout_ms: u64) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(timeout_ms))
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self::new(port))
    }
}

impl<L: Link> Transport<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            assembler: Box::default(),
            verbose: false,
        }
    }

    /// Print raw frames to stderr.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn port_name(&self) -> String {
        self.link.name()
    }

    #[cfg(test)]
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Send one request frame.
    pub fn send(&mut self, opcode: Opcode, payload: &[u8]) -> Result<()> {
        let encoded = frame::encode(opcode.as_u8(), payload)
            .with_context(|| format!("Payload of {} bytes is too large", payload.len()))?;
        if self.verbose {
            eprintln!("TX {:02x?}", encoded);
        }
        self.link
            .write_all(&encoded)
            .context("Failed to write to serial port")?;
        self.link.flush()?;
        Ok(())
    }

    /// Receive one response frame and check it answers `opcode`.
    pub fn receive(&mut self, opcode: Opcode) -> Result<Response> {
        self.assembler.reset();
        let mut byte = [0u8; 1];

        loop {
            match self.link.read(&mut byte) {
                Ok(1) => {}
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    bail!("Timeout waiting for {:?} response", opcode);
                }
                Err(e) => bail!("Serial read error: {}", e),
            }

            match self.assembler.feed(byte[0]) {
                Feed::InProgress => {}
                Feed::Discarded(err) => {
                    if self.verbose {
                        eprintln!("RX discarded: {:?}", err);
                    }
                }
                Feed::Complete => break,
            }
        }

        let frame = self
            .assembler
            .frame()
            .context("Assembler completed without a frame")?;
        let response = Response {
            opcode: frame.opcode(),
            payload: frame.payload().to_vec(),
        };
        self.assembler.reset();

        if self.verbose {
            eprintln!("RX {:?} {:02x?}", response.opcode, response.payload);
        }
        if response.opcode != opcode {
            bail!(
                "Unexpected response opcode {:?} (expected {:?})",
                response.opcode,
                opcode
            );
        }
        Ok(response)
    }

    fn drain_rx(&mut self) {
        let mut buf = [0u8; 64];
        let old_timeout = self.link.timeout();
        let _ = self.link.set_timeout(Duration::from_millis(10));
        while self.link.read(&mut buf).unwrap_or(0) > 0 {}
        let _ = self.link.set_timeout(old_timeout);
    }

    /// Send a request and wait for the response.
    pub fn send_recv(&mut self, opcode: Opcode, payload: &[u8]) -> Result<Response> {
        self.drain_rx();
        self.send(opcode, payload)?;
        self.receive(opcode)
    }

    /// Send a request and wait for the response with a custom timeout.
    pub fn send_recv_timeout(
        &mut self,
        opcode: Opcode,
        payload: &[u8],
        timeout_ms: u64,
    ) -> Result<Response> {
        let old_timeout = self.link.timeout();
        self.link
            .set_timeout(Duration::from_millis(timeout_ms))
            .context("Failed to set timeout")?;

        let result = self.send_recv(opcode, payload);

        let _ = self.link.set_timeout(old_timeout);
        result
    }

    /// Send a request that is answered by an ack and fail on any error code.
    pub fn command(&mut self, opcode: Opcode, payload: &[u8], timeout_ms: u64) -> Result<()> {
        let response = self.send_recv_timeout(opcode, payload, timeout_ms)?;
        let code = response.ack_code()?;
        if !code.is_ok() {
            return Err(DeviceError { opcode, code }.into());
        }
        Ok(())
    }
}

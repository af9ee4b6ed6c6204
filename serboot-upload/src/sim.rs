// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-process stand-ins for a serial port, used by the tests.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use serboot_common::protocol::AppRegion;
use serboot_common::ram_flash::RamFlash;
use serboot_common::{BootConfig, Session, Transmit};

use crate::transport::Link;

pub const SIM_FLASH_BASE: u32 = 0x1000_0000;
pub const SIM_DESCRIPTOR_ADDR: u32 = 0x1000_C000;
pub const SIM_APP_START: u32 = 0x1001_0000;
pub const SIM_APP_END: u32 = 0x1002_0000;

const SIM_FLASH_SIZE: usize = (SIM_APP_END - SIM_FLASH_BASE) as usize;

#[derive(Default)]
struct Outbox(VecDeque<u8>);

impl Transmit for Outbox {
    fn send(&mut self, bytes: &[u8]) {
        self.0.extend(bytes);
    }
}

/// A bootloader session running against RAM flash. Every written byte is
/// processed immediately, one millisecond apart.
pub struct SimDevice {
    session: Session,
    flash: Box<RamFlash<SIM_FLASH_SIZE>>,
    outbox: Outbox,
    now_ms: u64,
    timeout: Duration,
}

impl SimDevice {
    pub fn new() -> Self {
        let config = BootConfig {
            app_region: AppRegion::new(SIM_APP_START, SIM_APP_END),
            descriptor_addr: SIM_DESCRIPTOR_ADDR,
            ..BootConfig::DEFAULT
        };
        Self {
            session: Session::new(config),
            flash: Box::new(RamFlash::new(SIM_FLASH_BASE)),
            outbox: Outbox::default(),
            now_ms: 0,
            timeout: Duration::from_millis(1000),
        }
    }

    pub fn flash(&self) -> &RamFlash<SIM_FLASH_SIZE> {
        &self.flash
    }
}

impl Read for SimDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_queued(&mut self.outbox.0, buf)
    }
}

impl Write for SimDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            self.now_ms += 1;
            self.session
                .step(self.now_ms, Some(byte), self.flash.as_mut(), &mut self.outbox);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Link for SimDevice {
    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn name(&self) -> String {
        "sim".to_string()
    }
}

/// Replays fixed bytes and swallows writes.
pub struct Canned {
    rx: VecDeque<u8>,
}

impl Canned {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { rx: bytes.into() }
    }
}

impl Read for Canned {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_queued(&mut self.rx, buf)
    }
}

impl Write for Canned {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Link for Canned {
    fn timeout(&self) -> Duration {
        Duration::ZERO
    }

    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn name(&self) -> String {
        "canned".to_string()
    }
}

fn read_queued(queue: &mut VecDeque<u8>, buf: &mut [u8]) -> io::Result<usize> {
    if queue.is_empty() {
        return Err(io::ErrorKind::TimedOut.into());
    }
    let n = buf.len().min(queue.len());
    for (slot, byte) in buf.iter_mut().zip(queue.drain(..n)) {
        *slot = byte;
    }
    Ok(n)
}

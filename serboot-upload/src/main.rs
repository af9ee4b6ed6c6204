// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware upload tool for the serboot UART bootloader.
//!
//! Usage:
//!   serboot-upload --port /dev/ttyUSB0 info
//!   serboot-upload --port /dev/ttyUSB0 flash firmware.bin --boot
//!   serboot-upload --port /dev/ttyUSB0 erase 0x10010000 0x8000
//!   serboot-upload --port /dev/ttyUSB0 reset

mod cli;
mod commands;
mod config;
#[cfg(test)]
mod sim;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}

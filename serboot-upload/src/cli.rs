// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use serboot_common::protocol::APP_ADDR;

use crate::commands;
use crate::config::{Config, Settings};
use crate::transport::Transport;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "serboot-upload")]
#[command(about = "Firmware upload tool for the serboot UART bootloader")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyUSB0)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate [default: 115200]
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Response timeout in milliseconds [default: 5000]
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Bytes of image data per WRITE frame [default: 1024]
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Settings file [default: ./serboot.toml if present]
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print raw frames to stderr
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show bootloader version and MTU
    Info,

    /// Erase a flash range
    Erase {
        #[arg(value_parser = parse_int::parse::<u32>)]
        address: u32,
        #[arg(value_parser = parse_int::parse::<u32>)]
        size: u32,
    },

    /// Write a binary file at an address (range must be erased)
    Write {
        #[arg(value_parser = parse_int::parse::<u32>)]
        address: u32,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Check flash against a binary file and record the boot descriptor
    Verify {
        #[arg(value_parser = parse_int::parse::<u32>)]
        address: u32,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Erase, write and verify a firmware image
    Flash {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Load address
        #[arg(short, long, default_value_t = APP_ADDR, value_parser = parse_int::parse::<u32>)]
        address: u32,

        /// Boot the application after a successful verify
        #[arg(long)]
        boot: bool,
    },

    /// Start the application
    Boot,

    /// Reset the device
    Reset,
}

impl Cli {
    fn overrides(&self) -> Config {
        Config {
            port: self.port.clone(),
            baud_rate: self.baud,
            timeout_ms: self.timeout_ms,
            chunk_size: self.chunk_size,
        }
    }
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let file = Config::discover(cli.config.as_deref()).context("Failed to load settings")?;
    let settings = Settings::resolve(&cli.overrides(), &file);
    let port = settings
        .port
        .as_deref()
        .context("No serial port given (use --port or set `port` in serboot.toml)")?;

    let mut transport = Transport::open(port, settings.baud_rate, settings.timeout_ms)?;
    transport.set_verbose(cli.verbose);

    match cli.command {
        Commands::Info => commands::info(&mut transport),
        Commands::Erase { address, size } => commands::erase(&mut transport, address, size),
        Commands::Write { address, file } => {
            let image = commands::load_image(&file)?;
            commands::write(&mut transport, address, &image, settings.chunk_size)
        }
        Commands::Verify { address, file } => {
            let image = commands::load_image(&file)?;
            commands::verify(&mut transport, address, &image)
        }
        Commands::Flash {
            file,
            address,
            boot,
        } => {
            let image = commands::load_image(&file)?;
            commands::flash(&mut transport, address, &image, settings.chunk_size, boot)
        }
        Commands::Boot => commands::boot(&mut transport),
        Commands::Reset => commands::reset(&mut transport),
    }
}

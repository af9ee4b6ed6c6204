// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for bootloader operations.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use serboot_common::checksum::crc32;
use serboot_common::protocol::{InquiryParam, Opcode, PACKET_PAYLOAD_MAX_LENGTH, RANGE_PARAM_LEN};

use crate::transport::{Link, Transport};

/// Largest data chunk a WRITE frame can carry.
pub const MAX_CHUNK_SIZE: usize = PACKET_PAYLOAD_MAX_LENGTH - RANGE_PARAM_LEN;

/// Sector erase is slow; a full application region takes several seconds.
const ERASE_TIMEOUT_MS: u64 = 60_000;

pub fn load_image(file: &Path) -> Result<Vec<u8>> {
    let image = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    ensure!(!image.is_empty(), "{} is empty", file.display());
    Ok(image)
}

fn range_payload(address: u32, size: u32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(RANGE_PARAM_LEN);
    payload.extend_from_slice(&address.to_le_bytes());
    payload.extend_from_slice(&size.to_le_bytes());
    payload
}

fn image_len(image: &[u8]) -> Result<u32> {
    u32::try_from(image.len()).context("Image larger than 4 GiB")
}

/// Query and display version and MTU.
pub fn info<L: Link>(transport: &mut Transport<L>) -> Result<()> {
    let version = transport.send_recv(Opcode::Inquiry, &[InquiryParam::Version as u8])?;
    let &[major, minor] = version.payload.as_slice() else {
        bail!("Malformed version reply: {:02x?}", version.payload);
    };

    let mtu = transport.send_recv(Opcode::Inquiry, &[InquiryParam::Mtu as u8])?;
    let &[lo, hi] = mtu.payload.as_slice() else {
        bail!("Malformed MTU reply: {:02x?}", mtu.payload);
    };

    println!("Bootloader on {}:", transport.port_name());
    println!("  Version: {}.{}", major, minor);
    println!("  MTU:     {} bytes", u16::from_le_bytes([lo, hi]));
    Ok(())
}

/// Erase every sector overlapping `[address, address + size)`.
pub fn erase<L: Link>(transport: &mut Transport<L>, address: u32, size: u32) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Erasing {} bytes at 0x{:08x}", size, address));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = transport.command(Opcode::Erase, &range_payload(address, size), ERASE_TIMEOUT_MS);
    match result {
        Ok(()) => {
            pb.finish_with_message(format!("Erased {} bytes at 0x{:08x}", size, address));
            Ok(())
        }
        Err(e) => {
            pb.abandon();
            Err(e)
        }
    }
}

/// Program `image` at `address` in WRITE frames of at most `chunk_size` bytes.
pub fn write<L: Link>(
    transport: &mut Transport<L>,
    address: u32,
    image: &[u8],
    chunk_size: usize,
) -> Result<()> {
    ensure!(
        (1..=MAX_CHUNK_SIZE).contains(&chunk_size),
        "Chunk size must be between 1 and {} bytes",
        MAX_CHUNK_SIZE
    );
    let size = image_len(image)?;
    address
        .checked_add(size)
        .context("Image does not fit in the address space")?;

    let pb = ProgressBar::new(size as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let mut offset = 0u32;
    for chunk in image.chunks(chunk_size) {
        let chunk_addr = address + offset;
        let mut payload = range_payload(chunk_addr, chunk.len() as u32);
        payload.extend_from_slice(chunk);

        if let Err(e) = transport.command(Opcode::Write, &payload, 5000) {
            pb.abandon();
            return Err(e.context(format!("WRITE failed at 0x{:08x}", chunk_addr)));
        }

        offset += chunk.len() as u32;
        pb.set_position(offset as u64);
    }

    pb.finish_with_message("Write complete");
    Ok(())
}

/// Ask the device to CRC `image.len()` bytes at `address` and compare with
/// the image's CRC32. A match also records the boot descriptor.
pub fn verify<L: Link>(transport: &mut Transport<L>, address: u32, image: &[u8]) -> Result<()> {
    let size = image_len(image)?;
    let crc = crc32(image);

    print!(
        "Verifying {} bytes at 0x{:08x} (CRC32: 0x{:08x})... ",
        size, address, crc
    );
    std::io::stdout().flush()?;

    let mut payload = range_payload(address, size);
    payload.extend_from_slice(&crc.to_le_bytes());
    transport.command(Opcode::Verify, &payload, 10_000)?;

    println!("OK");
    Ok(())
}

/// Erase, write and verify an image, then optionally boot it.
pub fn flash<L: Link>(
    transport: &mut Transport<L>,
    address: u32,
    image: &[u8],
    chunk_size: usize,
    boot_after: bool,
) -> Result<()> {
    let size = image_len(image)?;
    println!(
        "Image:  {} bytes, CRC32: 0x{:08x}",
        size,
        crc32(image)
    );
    println!("Target: 0x{:08x}", address);
    println!();

    erase(transport, address, size)?;
    write(transport, address, image, chunk_size)?;
    verify(transport, address, image)?;

    println!();
    println!("Firmware flashed successfully!");

    if boot_after {
        boot(transport)?;
    } else {
        println!(
            "Use 'serboot-upload --port {} boot' to start the application.",
            transport.port_name()
        );
    }
    Ok(())
}

/// Start the application.
pub fn boot<L: Link>(transport: &mut Transport<L>) -> Result<()> {
    print!("Booting application... ");
    std::io::stdout().flush()?;

    transport.command(Opcode::Boot, &[], 2000)?;

    println!("OK");
    Ok(())
}

/// Reset the device.
pub fn reset<L: Link>(transport: &mut Transport<L>) -> Result<()> {
    print!("Resetting device... ");
    std::io::stdout().flush()?;

    transport.command(Opcode::Reset, &[], 2000)?;

    println!("OK");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimDevice, SIM_APP_START, SIM_DESCRIPTOR_ADDR};
    use crate::transport::DeviceError;
    use serboot_common::protocol::ErrorCode;
    use serboot_common::{BootDescriptor, BOOT_DESCRIPTOR_SIZE};

    fn image(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    fn device_error(err: &anyhow::Error) -> DeviceError {
        *err.downcast_ref::<DeviceError>().unwrap()
    }

    #[test]
    fn test_info_against_device() {
        let mut transport = Transport::new(SimDevice::new());
        info(&mut transport).unwrap();
    }

    #[test]
    fn test_flash_programs_image_and_descriptor() {
        let mut transport = Transport::new(SimDevice::new());
        let img = image(5000);

        flash(&mut transport, SIM_APP_START, &img, 1024, false).unwrap();

        let dev = transport_device(&transport);
        assert_eq!(dev.flash().contents(SIM_APP_START, img.len()), img.as_slice());
        let raw: [u8; BOOT_DESCRIPTOR_SIZE] = dev
            .flash()
            .contents(SIM_DESCRIPTOR_ADDR, BOOT_DESCRIPTOR_SIZE)
            .try_into()
            .unwrap();
        let bd = BootDescriptor::parse(&raw).unwrap();
        assert_eq!(bd.address, SIM_APP_START);
        assert_eq!(bd.length, 5000);
        assert_eq!(bd.crc32, crc32(&img));
    }

    #[test]
    fn test_write_with_max_chunk_size() {
        let mut transport = Transport::new(SimDevice::new());
        let img = image(MAX_CHUNK_SIZE + 10);

        write(&mut transport, SIM_APP_START, &img, MAX_CHUNK_SIZE).unwrap();

        let dev = transport_device(&transport);
        assert_eq!(dev.flash().contents(SIM_APP_START, img.len()), img.as_slice());
    }

    #[test]
    fn test_write_rejects_bad_chunk_size() {
        let mut transport = Transport::new(SimDevice::new());
        assert!(write(&mut transport, SIM_APP_START, &[1, 2, 3], 0).is_err());
        assert!(write(&mut transport, SIM_APP_START, &[1, 2, 3], MAX_CHUNK_SIZE + 1).is_err());
    }

    #[test]
    fn test_verify_without_write_reports_crc_mismatch() {
        let mut transport = Transport::new(SimDevice::new());
        let err = verify(&mut transport, SIM_APP_START, &image(64)).unwrap_err();
        assert_eq!(device_error(&err).code, ErrorCode::Verify);
    }

    #[test]
    fn test_erase_outside_app_region_reports_param_error() {
        let mut transport = Transport::new(SimDevice::new());
        let err = erase(&mut transport, SIM_DESCRIPTOR_ADDR, 0x1000).unwrap_err();
        assert_eq!(
            device_error(&err),
            DeviceError {
                opcode: Opcode::Erase,
                code: ErrorCode::Param
            }
        );
    }

    #[test]
    fn test_write_failure_names_chunk_address() {
        let mut transport = Transport::new(SimDevice::new());
        // Runs past the end of the application region on the second chunk.
        let start = crate::sim::SIM_APP_END - 1024;
        let err = write(&mut transport, start, &image(2048), 1024).unwrap_err();
        let expected = format!("WRITE failed at 0x{:08x}", start + 1024);
        assert_eq!(err.to_string(), expected);
        assert_eq!(device_error(&err).code, ErrorCode::Param);
    }

    #[test]
    fn test_boot_and_reset_are_acked() {
        let mut transport = Transport::new(SimDevice::new());
        boot(&mut transport).unwrap();
        reset(&mut transport).unwrap();
    }

    #[test]
    fn test_load_image_rejects_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_image(file.path()).is_err());
    }

    fn transport_device(transport: &Transport<SimDevice>) -> &SimDevice {
        transport.link()
    }
}

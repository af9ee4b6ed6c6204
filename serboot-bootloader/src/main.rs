// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serboot: UART field-update bootloader for RP2040.

#![no_std]
#![no_main]

mod boot;
mod flash;
mod peripherals;
mod uart;
mod update;

use defmt_rtt as _;
use panic_probe as _;

use serboot_common::protocol::{APP_ADDR, BOOT_DESCRIPTOR_ADDR};
use serboot_common::ByteQueue;

defmt::timestamp!("{=u64:us}", { peripherals::now_us() });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Bootloader init");

    let p = peripherals::init();
    let flash = flash::Rp2040Flash::new();

    match flash::read_boot_descriptor(BOOT_DESCRIPTOR_ADDR) {
        Some(bd) => defmt::println!(
            "Boot descriptor: addr=0x{:08x}, len={}, crc=0x{:08x}",
            bd.address,
            bd.length,
            bd.crc32
        ),
        None => defmt::println!("No boot descriptor, app region 0x{:08x}", APP_ADDR),
    }

    let queue = cortex_m::singleton!(: ByteQueue<{ uart::RX_QUEUE_SIZE }> = ByteQueue::new())
        .unwrap();
    let (producer, consumer) = queue.split();
    let tx = uart::start(p.uart, producer);

    defmt::println!("UART0 up at {} baud", peripherals::UART_BAUD_RATE);

    update::run(&p.timer, consumer, tx, flash)
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial update loop.
//!
//! Pulls received bytes through the session one at a time, logs what
//! happened and performs BOOT/RESET once their ack has left the UART.

use serboot_common::{Action, BootConfig, Consumer, Dispatch, Event, Reply, Session};

use crate::boot;
use crate::flash::Rp2040Flash;
use crate::uart::{self, UartTx, RX_QUEUE_SIZE};

pub fn run(
    timer: &rp2040_hal::Timer,
    mut rx: Consumer<'static, RX_QUEUE_SIZE>,
    mut tx: UartTx,
    mut flash: Rp2040Flash,
) -> ! {
    let mut session = Session::new(BootConfig::DEFAULT);

    defmt::println!("Waiting for commands");

    loop {
        let now_ms = timer.get_counter().ticks() / 1000;

        match session.poll(now_ms, &mut rx, &mut flash, &mut tx) {
            Event::Idle | Event::Progress => {}
            Event::Discarded(err) => defmt::println!("Frame discarded: {}", err),
            Event::TimedOut => defmt::println!("Frame timed out"),
            Event::Dispatched(result) => handle_dispatch(&result, &tx),
        }

        let dropped = uart::take_dropped();
        if dropped > 0 {
            defmt::println!("RX queue full, {} byte(s) dropped", dropped);
        }
    }
}

fn handle_dispatch(result: &Dispatch, tx: &UartTx) {
    match result.reply {
        Some(Reply::Ack(code)) => defmt::println!("{}: {}", result.opcode, code),
        Some(reply) => defmt::println!("{}: {}", result.opcode, reply),
        None => defmt::println!("{}: no reply", result.opcode),
    }

    match result.descriptor {
        Some(Ok(bd)) => defmt::println!(
            "Boot descriptor written: addr=0x{:08x}, len={}, crc=0x{:08x}",
            bd.address,
            bd.length,
            bd.crc32
        ),
        Some(Err(err)) => defmt::println!("Boot descriptor write failed: {}", err),
        None => {}
    }

    match result.action {
        Action::Continue => {}
        Action::Boot { entry } => {
            tx.flush();
            boot::jump_to_app(entry);
        }
        Action::Reset => {
            defmt::println!("Resetting");
            tx.flush();
            boot::system_reset();
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Peripheral initialization for the bootloader.

use core::sync::atomic::{AtomicBool, Ordering};

use rp2040_hal as hal;
use rp2040_hal::fugit::RateExtU32;
use rp2040_hal::uart::{DataBits, StopBits, UartConfig, UartPeripheral};

use crate::uart::{Uart, UartPins};

pub const UART_BAUD_RATE: u32 = 115_200;

/// Set once TIMER is out of reset.
static TIMER_READY: AtomicBool = AtomicBool::new(false);

pub struct Peripherals {
    pub timer: hal::Timer,
    pub uart: Uart,
}

pub fn init() -> Peripherals {
    let mut pac = unsafe { hal::pac::Peripherals::steal() };

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let clocks = hal::clocks::init_clocks_and_plls(
        12_000_000u32,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    TIMER_READY.store(true, Ordering::Release);
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // UART0 on GP0 (TX) / GP1 (RX), 8N1
    let uart_pins: UartPins = (pins.gpio0.reconfigure(), pins.gpio1.reconfigure());
    let uart = UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(UART_BAUD_RATE.Hz(), DataBits::Eight, None, StopBits::One),
            hal::Clock::freq(&clocks.peripheral_clock),
        )
        .unwrap();

    Peripherals { timer, uart }
}

/// Microseconds since boot, for log timestamps. Zero until `init` has run.
pub fn now_us() -> u64 {
    if !TIMER_READY.load(Ordering::Acquire) {
        return 0;
    }
    // TIMERAWH/TIMERAWL are latch-free, so re-read until the high word is stable.
    let timer = unsafe { &*hal::pac::TIMER::ptr() };
    loop {
        let hi = timer.timerawh().read().bits();
        let lo = timer.timerawl().read().bits();
        if timer.timerawh().read().bits() == hi {
            return ((hi as u64) << 32) | lo as u64;
        }
    }
}

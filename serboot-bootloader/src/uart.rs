// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UART0 transport: interrupt-driven receive into the byte queue, blocking
//! transmit for response frames.

use core::cell::RefCell;

use cortex_m::interrupt::Mutex;
use rp2040_hal::gpio::bank0::{Gpio0, Gpio1};
use rp2040_hal::gpio::{FunctionUart, Pin, PullDown};
use rp2040_hal::pac::{self, interrupt};
use rp2040_hal::uart::{Enabled, Reader, UartPeripheral, Writer};
use serboot_common::{Producer, Transmit};

/// Receive queue storage. One slot is kept free, so 1023 bytes fit.
pub const RX_QUEUE_SIZE: usize = 1024;

pub type UartPins = (
    Pin<Gpio0, FunctionUart, PullDown>,
    Pin<Gpio1, FunctionUart, PullDown>,
);
pub type Uart = UartPeripheral<Enabled, pac::UART0, UartPins>;

struct RxPath {
    reader: Reader<pac::UART0, UartPins>,
    producer: Producer<'static, RX_QUEUE_SIZE>,
    dropped: u32,
}

impl RxPath {
    fn push_all(&mut self, bytes: &[u8]) {
        let lost = self.producer.push_slice(bytes) as u32;
        self.dropped = self.dropped.wrapping_add(lost);
    }
}

static RX_PATH: Mutex<RefCell<Option<RxPath>>> = Mutex::new(RefCell::new(None));

/// Blocking transmit half.
pub struct UartTx {
    writer: Writer<pac::UART0, UartPins>,
}

impl UartTx {
    /// Wait until the last stop bit has left the shift register.
    pub fn flush(&self) {
        let regs = unsafe { &*pac::UART0::ptr() };
        while regs.uartfr().read().busy().bit_is_set() {
            core::hint::spin_loop();
        }
    }
}

impl Transmit for UartTx {
    fn send(&mut self, bytes: &[u8]) {
        self.writer.write_full_blocking(bytes);
    }
}

/// Split the UART, hand the receive half to the interrupt handler and
/// return the transmit half.
pub fn start(uart: Uart, producer: Producer<'static, RX_QUEUE_SIZE>) -> UartTx {
    let (mut reader, writer) = uart.split();
    reader.enable_rx_interrupt();

    cortex_m::interrupt::free(|cs| {
        RX_PATH.borrow(cs).replace(Some(RxPath {
            reader,
            producer,
            dropped: 0,
        }));
    });

    unsafe {
        pac::NVIC::unmask(pac::Interrupt::UART0_IRQ);
    }

    UartTx { writer }
}

/// Bytes lost to a full queue since the last call.
pub fn take_dropped() -> u32 {
    cortex_m::interrupt::free(|cs| {
        RX_PATH
            .borrow(cs)
            .borrow_mut()
            .as_mut()
            .map_or(0, |rx| core::mem::take(&mut rx.dropped))
    })
}

#[interrupt]
fn UART0_IRQ() {
    cortex_m::interrupt::free(|cs| {
        let mut rx_path = RX_PATH.borrow(cs).borrow_mut();
        let Some(rx) = rx_path.as_mut() else {
            return;
        };

        let mut buf = [0u8; 32];
        loop {
            // Stops on an empty FIFO or a line error. The interrupt stays
            // pending while data remains.
            match rx.reader.read_raw(&mut buf) {
                Ok(n) => rx.push_all(&buf[..n]),
                Err(nb::Error::Other(err)) => {
                    // Bytes read before the faulty one are still good.
                    rx.push_all(err.discarded);
                    break;
                }
                Err(nb::Error::WouldBlock) => break,
            }
        }
    });
}


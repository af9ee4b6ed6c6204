// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! One bootloader session: the frame assembler, the dispatcher and the
//! inter-byte timeout, driven one byte per main-loop iteration.
//!
//! The timeout is armed only while a frame is in progress. While the line is
//! idle the reference timestamp keeps moving, so a long pause between frames
//! never discards the first byte of the next one.

use crate::config::BootConfig;
use crate::dispatch::{Dispatch, Dispatcher, Flash, Transmit};
use crate::frame::{Feed, FrameAssembler, FrameError};
use crate::queue::Consumer;

/// Outcome of one `Session::step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// No byte was available.
    Idle,
    /// A byte was consumed without finishing a frame.
    Progress,
    /// A partial frame was dropped.
    Discarded(FrameError),
    /// A partial frame stalled and was dropped. Nothing is sent.
    TimedOut,
    /// A complete frame was handled and answered.
    Dispatched(Dispatch),
}

pub struct Session {
    assembler: FrameAssembler,
    dispatcher: Dispatcher,
    last_byte_ms: u64,
}

impl Session {
    pub const fn new(config: BootConfig) -> Self {
        Self {
            assembler: FrameAssembler::new(),
            dispatcher: Dispatcher::new(config),
            last_byte_ms: 0,
        }
    }

    pub fn assembler(&self) -> &FrameAssembler {
        &self.assembler
    }

    pub fn config(&self) -> &BootConfig {
        self.dispatcher.config()
    }

    /// Pull at most one byte from the receive queue and process it.
    pub fn poll<const N: usize, F: Flash, T: Transmit>(
        &mut self,
        now_ms: u64,
        rx: &mut Consumer<'_, N>,
        flash: &mut F,
        tx: &mut T,
    ) -> Event {
        if self.timed_out(now_ms) {
            return self.expire();
        }
        let byte = rx.pop();
        self.process(now_ms, byte, flash, tx)
    }

    /// Process one optional byte received at `now_ms`.
    ///
    /// A byte arriving after the timeout expired starts the next frame.
    pub fn step<F: Flash, T: Transmit>(
        &mut self,
        now_ms: u64,
        byte: Option<u8>,
        flash: &mut F,
        tx: &mut T,
    ) -> Event {
        if self.timed_out(now_ms) {
            let event = self.expire();
            if let Some(byte) = byte {
                // A single byte into a fresh assembler never completes a frame.
                self.last_byte_ms = now_ms;
                self.assembler.feed(byte);
            }
            return event;
        }
        self.process(now_ms, byte, flash, tx)
    }

    fn timed_out(&self, now_ms: u64) -> bool {
        self.assembler.in_progress()
            && now_ms.saturating_sub(self.last_byte_ms) > self.dispatcher.config().byte_timeout_ms
    }

    fn expire(&mut self) -> Event {
        self.assembler.reset();
        Event::TimedOut
    }

    fn process<F: Flash, T: Transmit>(
        &mut self,
        now_ms: u64,
        byte: Option<u8>,
        flash: &mut F,
        tx: &mut T,
    ) -> Event {
        let Some(byte) = byte else {
            if !self.assembler.in_progress() {
                self.last_byte_ms = now_ms;
            }
            return Event::Idle;
        };
        self.last_byte_ms = now_ms;

        match self.assembler.feed(byte) {
            Feed::InProgress => Event::Progress,
            Feed::Discarded(err) => Event::Discarded(err),
            Feed::Complete => {
                let event = match self.assembler.frame() {
                    Some(frame) => Event::Dispatched(self.dispatcher.dispatch(&frame, flash, tx)),
                    None => Event::Progress,
                };
                self.assembler.reset();
                event
            }
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Single-producer/single-consumer byte queue.
//!
//! The producer half lives in the UART receive interrupt, the consumer half in
//! the main loop. Backed by `heapless::spsc`, which only needs atomic loads and
//! stores and so runs on Cortex-M0+. One slot of the storage stays free.

use heapless::spsc;

pub struct ByteQueue<const N: usize> {
    inner: spsc::Queue<u8, N>,
}

impl<const N: usize> ByteQueue<N> {
    pub const fn new() -> Self {
        Self {
            inner: spsc::Queue::new(),
        }
    }

    /// Number of bytes the queue can hold at once.
    pub const fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Split into the producer and consumer halves.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let (producer, consumer) = self.inner.split();
        (Producer { inner: producer }, Consumer { inner: consumer })
    }
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-side handle. Never blocks.
pub struct Producer<'a, const N: usize> {
    inner: spsc::Producer<'a, u8, N>,
}

impl<const N: usize> Producer<'_, N> {
    /// Append a byte. Returns false and drops the byte if the queue is full.
    pub fn push(&mut self, byte: u8) -> bool {
        self.inner.enqueue(byte).is_ok()
    }

    /// Append every byte that fits and return how many were dropped.
    pub fn push_slice(&mut self, bytes: &[u8]) -> usize {
        let mut dropped = 0;
        for &byte in bytes {
            if !self.push(byte) {
                dropped += 1;
            }
        }
        dropped
    }

    pub fn is_full(&self) -> bool {
        !self.inner.ready()
    }
}

/// Main-loop handle.
pub struct Consumer<'a, const N: usize> {
    inner: spsc::Consumer<'a, u8, N>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Take the oldest byte, if any.
    pub fn pop(&mut self) -> Option<u8> {
        self.inner.dequeue()
    }

    pub fn is_empty(&self) -> bool {
        !self.inner.ready()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

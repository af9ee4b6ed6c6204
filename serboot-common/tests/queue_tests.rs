// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the SPSC receive queue.

use serboot_common::queue::ByteQueue;

#[test]
fn test_capacity_is_storage_minus_one() {
    let queue = ByteQueue::<16>::new();
    assert_eq!(queue.capacity(), 15);
    assert!(queue.is_empty());
    assert!(!queue.is_full());
}

#[test]
fn test_pop_on_empty_returns_none() {
    let mut queue = ByteQueue::<4>::new();
    let (_tx, mut rx) = queue.split();
    assert_eq!(rx.pop(), None);
    assert!(rx.is_empty());
}

#[test]
fn test_fifo_order() {
    let mut queue = ByteQueue::<8>::new();
    let (mut tx, mut rx) = queue.split();
    for b in [1u8, 2, 3] {
        assert!(tx.push(b));
    }
    assert_eq!(rx.len(), 3);
    assert_eq!(rx.pop(), Some(1));
    assert_eq!(rx.pop(), Some(2));
    assert_eq!(rx.pop(), Some(3));
    assert_eq!(rx.pop(), None);
}

#[test]
fn test_push_on_full_drops_byte() {
    let mut queue = ByteQueue::<4>::new();
    let (mut tx, mut rx) = queue.split();
    assert!(tx.push(0xA0));
    assert!(tx.push(0xA1));
    assert!(tx.push(0xA2));
    assert!(tx.is_full());
    assert!(!tx.push(0xA3));

    assert_eq!(rx.pop(), Some(0xA0));
    assert_eq!(rx.pop(), Some(0xA1));
    assert_eq!(rx.pop(), Some(0xA2));
    assert_eq!(rx.pop(), None);
}

#[test]
fn test_wraparound() {
    let mut queue = ByteQueue::<4>::new();
    let (mut tx, mut rx) = queue.split();
    for round in 0..10u8 {
        assert!(tx.push(round));
        assert!(tx.push(round.wrapping_add(100)));
        assert_eq!(rx.pop(), Some(round));
        assert_eq!(rx.pop(), Some(round.wrapping_add(100)));
        assert!(rx.is_empty());
    }
}

#[test]
fn test_len_tracks_pushes_and_pops() {
    let mut queue = ByteQueue::<8>::new();
    {
        let (mut tx, mut rx) = queue.split();
        for b in 0..5 {
            tx.push(b);
        }
        rx.pop();
        assert_eq!(rx.len(), 4);
    }
    assert_eq!(queue.len(), 4);
}

#[test]
fn test_concurrent_producer_and_consumer() {
    const COUNT: usize = 100_000;
    let mut queue = ByteQueue::<64>::new();
    let (mut tx, mut rx) = queue.split();

    std::thread::scope(|s| {
        s.spawn(move || {
            for i in 0..COUNT {
                while !tx.push(i as u8) {
                    std::hint::spin_loop();
                }
            }
        });

        let mut expected = 0usize;
        while expected < COUNT {
            if let Some(b) = rx.pop() {
                assert_eq!(b, expected as u8);
                expected += 1;
            }
        }
    });
}

#[test]
fn test_push_slice_keeps_what_fits() {
    let mut queue = ByteQueue::<4>::new();
    let (mut tx, mut rx) = queue.split();

    assert_eq!(tx.push_slice(&[1, 2]), 0);
    assert_eq!(tx.push_slice(&[3, 4, 5]), 2);
    assert!(tx.is_full());

    assert_eq!(rx.pop(), Some(1));
    assert_eq!(rx.pop(), Some(2));
    assert_eq!(rx.pop(), Some(3));
    assert_eq!(rx.pop(), None);
}

#[test]
fn test_receive_queue_size_holds_one_less_byte() {
    let mut queue = ByteQueue::<1024>::new();
    assert_eq!(queue.capacity(), 1023);
    let (mut tx, _rx) = queue.split();
    let bytes = [0x5Au8; 1024];
    assert_eq!(tx.push_slice(&bytes), 1);
}

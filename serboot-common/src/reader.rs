// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bounded little-endian field reader over a payload slice.

pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        bytes.try_into().ok()
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    pub fn read_u16_le(&mut self) -> Option<u16> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    pub fn read_u32_le(&mut self) -> Option<u32> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    /// Bytes not consumed yet.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian_fields() {
        let data = [0x00, 0x00, 0x01, 0x10, 0x08, 0x00, 0x00, 0x00, 0xAB];
        let mut r = FieldReader::new(&data);
        assert_eq!(r.read_u32_le(), Some(0x1001_0000));
        assert_eq!(r.read_u32_le(), Some(8));
        assert_eq!(r.remaining(), 1);
        assert_eq!(r.rest(), &[0xAB]);
        assert_eq!(r.read_u8(), Some(0xAB));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_short_read_fails_without_advancing() {
        let data = [0x34, 0x12, 0xFF];
        let mut r = FieldReader::new(&data);
        assert_eq!(r.read_u32_le(), None);
        assert_eq!(r.read_u16_le(), Some(0x1234));
        assert_eq!(r.read_u16_le(), None);
        assert_eq!(r.rest(), &[0xFF]);
    }

    #[test]
    fn test_empty_slice() {
        let mut r = FieldReader::new(&[]);
        assert_eq!(r.read_u8(), None);
        assert!(r.rest().is_empty());
    }
}

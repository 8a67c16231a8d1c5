
//! Specialized binary input and output.
//! Bits are packed least significant bit first within each byte,
//! and bytes follow each other in ascending address order.
//!
//! Running past the end of the buffer does not abort a read or write immediately.
//! Instead, the stream becomes exhausted: every following operation is a no-op,
//! and reads yield zero. This allows decoding a whole subblock tree
//! and detecting the failure once at the end.

use crate::error::{Error, Result};


/// Reads fixed width bit fields from a byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'b> {
    bytes: &'b [u8],

    /// `None` if a read exceeded the buffer.
    position: Option<usize>,
}

/// Writes fixed width bit fields into a byte slice.
/// Only the written bits are modified, all other bits keep their value.
#[derive(Debug)]
pub struct BitWriter<'b> {
    bytes: &'b mut [u8],

    /// `None` if a write exceeded the buffer.
    position: Option<usize>,
}


impl<'b> BitReader<'b> {

    /// Start reading at the first bit of the slice.
    pub fn new(bytes: &'b [u8]) -> Self {
        Self { bytes, position: Some(0) }
    }

    /// Start reading at an arbitrary bit of the slice.
    pub fn at_bit(bytes: &'b [u8], bit_position: usize) -> Self {
        Self { bytes, position: Some(bit_position) }
    }

    /// Read an unsigned value of `bit_count` bits, where `bit_count` is at most 32.
    /// Returns zero and exhausts the reader if the bits are not inside the buffer.
    pub fn read(&mut self, bit_count: u32) -> u32 {
        debug_assert!(bit_count <= 32, "bit field too large");

        let start = match self.advance(bit_count as usize) {
            Some(start) => start,
            None => return 0,
        };

        let mut value: u64 = 0;
        let mut position = start;
        let mut shift = 0;
        let mut remaining = bit_count as usize;

        while remaining > 0 {
            let offset = position & 7;
            let eat = remaining.min(8 - offset);
            let bits = (u64::from(self.bytes[position / 8]) >> offset) & ((1 << eat) - 1);

            value |= bits << shift;
            position += eat;
            shift += eat;
            remaining -= eat;
        }

        value as u32
    }

    /// Read a two's complement value of `bit_count` bits, sign extended from its last bit.
    pub fn read_signed(&mut self, bit_count: u32) -> i32 {
        if bit_count == 0 { return 0; }

        let unused = 32 - bit_count;
        ((self.read(bit_count) << unused) as i32) >> unused
    }

    /// Consume bits without looking at them. May be more than 32 bits.
    pub fn skip(&mut self, bit_count: usize) {
        self.advance(bit_count);
    }

    /// Whether any operation ran past the end of the buffer.
    pub fn is_exhausted(&self) -> bool {
        self.position.is_none()
    }

    /// The current bit position, or `None` if exhausted.
    pub fn bit_position(&self) -> Option<usize> {
        self.position
    }

    /// The number of bytes touched so far, rounding up partially consumed bytes.
    /// Fails if the reader is exhausted.
    pub fn consumed_bytes(&self) -> Result<usize> {
        self.position
            .map(|bits| (bits + 7) >> 3)
            .ok_or_else(|| Error::overflow("bit stream read past the end of the subblock"))
    }

    /// Returns the start position and moves forward, or exhausts the reader.
    fn advance(&mut self, bit_count: usize) -> Option<usize> {
        let start = self.position?;
        let end = start.checked_add(bit_count).filter(|&end| end <= self.bytes.len() * 8);

        self.position = end;
        end.map(|_| start)
    }
}


impl<'b> BitWriter<'b> {

    /// Start writing at the first bit of the slice.
    pub fn new(bytes: &'b mut [u8]) -> Self {
        Self { bytes, position: Some(0) }
    }

    /// Write the lowest `bit_count` bits of the value, where `bit_count` is at most 32.
    /// Higher bits of the value are ignored.
    /// Exhausts the writer without modifying the buffer if the bits do not fit.
    pub fn write(&mut self, value: u32, bit_count: u32) {
        debug_assert!(bit_count <= 32, "bit field too large");

        let start = match self.position {
            Some(start) => start,
            None => return,
        };

        let end = start + bit_count as usize;
        if end > self.bytes.len() * 8 {
            self.position = None;
            return;
        }

        let mut value = u64::from(value) & ((1_u64 << bit_count) - 1);
        let mut position = start;

        while position < end {
            let offset = position & 7;
            let eat = (end - position).min(8 - offset);
            let mask = (((1_u16 << eat) - 1) << offset) as u8;
            let byte = &mut self.bytes[position / 8];

            *byte = (*byte & !mask) | (((value << offset) as u8) & mask);
            value >>= eat;
            position += eat;
        }

        self.position = Some(end);
    }

    /// Write `bit_count` zero bits. May be more than 32 bits.
    pub fn write_zeroes(&mut self, mut bit_count: usize) {
        while bit_count > 0 {
            let chunk = bit_count.min(32);
            self.write(0, chunk as u32);
            bit_count -= chunk;
        }
    }

    /// Whether any operation ran past the end of the buffer.
    pub fn is_exhausted(&self) -> bool {
        self.position.is_none()
    }

    /// The current bit position, or `None` if exhausted.
    pub fn bit_position(&self) -> Option<usize> {
        self.position
    }

    /// The number of bytes touched so far, rounding up partially written bytes.
    /// Returns `None` if the writer is exhausted.
    pub fn written_bytes(&self) -> Option<usize> {
        self.position.map(|bits| (bits + 7) >> 3)
    }
}

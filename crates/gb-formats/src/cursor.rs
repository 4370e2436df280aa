//! Bit-precise cursor over the decoded project payload.
//!
//! Positions are bit offsets. Multi-byte integers are read byte by byte in
//! stream order (most significant bit first within each byte) and then
//! assembled according to the requested byte order, so they work at any
//! bit position, not just on byte boundaries.

use alloc::borrow::Cow;
use alloc::vec::Vec;

use crate::error::{DecodeError, DecodeErrorKind};

/// Width of an unsigned integer read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UintWidth {
    U8,
    U16,
    U24,
    U32,
}

impl UintWidth {
    pub const fn bits(self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
            Self::U24 => 24,
            Self::U32 => 32,
        }
    }

    const fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }
}

/// Byte order of a multi-byte read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Random-access reader over an immutable byte buffer.
#[derive(Clone, Debug)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    pos: u64,
}

impl<'a> BitCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Whole underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current bit position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Byte containing the current bit position.
    pub fn byte_position(&self) -> u64 {
        self.pos / 8
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    pub fn len_bits(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    pub fn remaining_bits(&self) -> u64 {
        self.len_bits().saturating_sub(self.pos)
    }

    /// Move to an absolute bit position. Seeking to the very end is allowed,
    /// seeking past it is not.
    pub fn seek(&mut self, bit_position: u64) -> Result<(), DecodeError> {
        if bit_position > self.len_bits() {
            return Err(self.out_of_bounds(bit_position.saturating_sub(self.pos)));
        }
        self.pos = bit_position;
        Ok(())
    }

    pub fn skip(&mut self, bits: u64) -> Result<(), DecodeError> {
        self.ensure(bits)?;
        self.pos += bits;
        Ok(())
    }

    pub fn skip_bytes(&mut self, n: u64) -> Result<(), DecodeError> {
        self.skip(n * 8)
    }

    /// Read up to 32 bits as a big-endian bit field.
    pub fn read_bits(&mut self, amount: u32) -> Result<u32, DecodeError> {
        debug_assert!(amount <= 32);
        self.ensure(amount as u64)?;
        let mut result: u32 = 0;
        let mut remaining = amount;
        while remaining > 0 {
            let byte = self.data[(self.pos / 8) as usize];
            let bit_in_byte = (self.pos % 8) as u32;
            let avail = 8 - bit_in_byte;
            let take = remaining.min(avail);
            let shift = avail - take;
            let mask = (1u32 << take) - 1;
            let val = ((byte as u32) >> shift) & mask;
            result = (result << take) | val;
            self.pos += take as u64;
            remaining -= take;
        }
        Ok(result)
    }

    pub fn read_uint(&mut self, width: UintWidth, order: ByteOrder) -> Result<u32, DecodeError> {
        self.ensure(width.bits() as u64)?;
        let mut bytes = [0u8; 4];
        for b in bytes.iter_mut().take(width.bytes()) {
            *b = self.read_bits(8)? as u8;
        }
        let n = width.bytes();
        let value = match order {
            ByteOrder::Little => bytes[..n]
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | b as u32),
            ByteOrder::Big => bytes[..n].iter().fold(0u32, |acc, &b| (acc << 8) | b as u32),
        };
        Ok(value)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_uint(UintWidth::U8, ByteOrder::Little)? as u8)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(self.read_uint(UintWidth::U16, ByteOrder::Little)? as u16)
    }

    pub fn read_u24_le(&mut self) -> Result<u32, DecodeError> {
        self.read_uint(UintWidth::U24, ByteOrder::Little)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        self.read_uint(UintWidth::U32, ByteOrder::Little)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        self.clone().read_u8()
    }

    /// Read `n` raw bytes. Borrows from the buffer when byte aligned.
    pub fn read_bytes(&mut self, n: usize) -> Result<Cow<'a, [u8]>, DecodeError> {
        self.ensure(n as u64 * 8)?;
        if self.is_byte_aligned() {
            let start = self.byte_position() as usize;
            self.pos += n as u64 * 8;
            return Ok(Cow::Borrowed(&self.data[start..start + n]));
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_bits(8)? as u8);
        }
        Ok(Cow::Owned(out))
    }

    /// Bytes from the current (byte-aligned) position to the end of the buffer.
    pub fn rest(&self) -> Result<&'a [u8], DecodeError> {
        if !self.is_byte_aligned() {
            return Err(self.out_of_bounds(8 - self.pos % 8));
        }
        Ok(&self.data[self.byte_position() as usize..])
    }

    /// Up to `len` bytes starting at byte `start`, clamped to the buffer.
    pub fn window(&self, start: u64, len: usize) -> &'a [u8] {
        let start = (start as usize).min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());
        &self.data[start..end]
    }

    fn ensure(&self, bits: u64) -> Result<(), DecodeError> {
        if bits > self.remaining_bits() {
            return Err(self.out_of_bounds(bits));
        }
        Ok(())
    }

    fn out_of_bounds(&self, requested_bits: u64) -> DecodeError {
        DecodeError::new(
            self.byte_position(),
            DecodeErrorKind::OutOfBounds {
                requested_bits,
                available_bits: self.remaining_bits(),
            },
        )
    }
}

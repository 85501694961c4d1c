//! Bit packing and the presence section of a column chunk.
//!
//! A chunk opens with one flag byte. `0` means every row in the chunk has a
//! value. `1` is followed by a `ceil(rows / 8)` byte bitmap, LSB first, where
//! a set bit marks a present value.

use bytes::{Buf, BufMut};

use super::{DecodeError, DecodeResult};

const ALL_PRESENT: u8 = 0;
const HAS_BITMAP: u8 = 1;

/// Growable LSB-first bit vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedBits {
    bytes: Vec<u8>,
    len: usize,
}

impl PackedBits {
    /// Creates an empty bit vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes needed to hold `bits` bits.
    #[inline]
    pub const fn byte_len(bits: usize) -> usize {
        (bits + 7) / 8
    }

    /// Appends a bit.
    #[inline]
    pub fn push(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            self.bytes[self.len / 8] |= 1 << (self.len % 8);
        }
        self.len += 1;
    }

    /// Returns the bit at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no bits have been pushed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Removes all bits, keeping the allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.len = 0;
    }

    /// Reads `len` packed bits.
    pub fn read(buf: &mut impl Buf, len: usize) -> DecodeResult<Self> {
        let byte_len = Self::byte_len(len);
        if buf.remaining() < byte_len {
            return Err(DecodeError::new(format!(
                "bitmap needs {} bytes, {} remain",
                byte_len,
                buf.remaining()
            )));
        }
        let mut bytes = vec![0u8; byte_len];
        buf.copy_to_slice(&mut bytes);
        if len % 8 != 0 {
            // Clear padding so `count_ones` only sees real bits.
            let last = byte_len - 1;
            bytes[last] &= (1u8 << (len % 8)) - 1;
        }
        Ok(Self { bytes, len })
    }
}

/// Accumulates per-row presence for one column chunk.
#[derive(Debug, Clone, Default)]
pub struct PresenceBuilder {
    bits: PackedBits,
    null_count: usize,
}

impl PresenceBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one row.
    #[inline]
    pub fn push(&mut self, present: bool) {
        if !present {
            self.null_count += 1;
        }
        self.bits.push(present);
    }

    /// Rows recorded so far.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true if no rows have been recorded.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Null rows recorded so far.
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    /// Encoded size of the presence section.
    pub fn encoded_len(&self) -> usize {
        if self.null_count == 0 {
            1
        } else {
            1 + self.bits.as_bytes().len()
        }
    }

    /// Writes the presence section.
    pub fn write_to(&self, buf: &mut impl BufMut) {
        if self.null_count == 0 {
            buf.put_u8(ALL_PRESENT);
        } else {
            buf.put_u8(HAS_BITMAP);
            buf.put_slice(self.bits.as_bytes());
        }
    }

    /// Resets the builder for the next chunk.
    pub fn clear(&mut self) {
        self.bits.clear();
        self.null_count = 0;
    }
}

/// Decoded presence section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// No row in the chunk is null.
    AllPresent(usize),
    /// Per-row presence bits.
    Bitmap(PackedBits),
}

impl Presence {
    /// Reads the presence section for a chunk of `rows` rows.
    pub fn read(buf: &mut impl Buf, rows: usize) -> DecodeResult<Self> {
        if !buf.has_remaining() {
            return Err(DecodeError::new("missing presence flag"));
        }
        match buf.get_u8() {
            ALL_PRESENT => Ok(Self::AllPresent(rows)),
            HAS_BITMAP => PackedBits::read(buf, rows).map(Self::Bitmap),
            other => Err(DecodeError::new(format!("invalid presence flag {}", other))),
        }
    }

    /// Returns true if row `index` holds a value.
    #[inline]
    pub fn is_present(&self, index: usize) -> bool {
        match self {
            Self::AllPresent(_) => true,
            Self::Bitmap(bits) => bits.get(index),
        }
    }

    /// Number of rows holding a value.
    pub fn present_count(&self) -> usize {
        match self {
            Self::AllPresent(rows) => *rows,
            Self::Bitmap(bits) => bits.count_ones(),
        }
    }
}

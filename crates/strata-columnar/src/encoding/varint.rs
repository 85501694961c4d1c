//! LEB128 varints and zig-zag mapping.

use bytes::{Buf, BufMut};

use super::{DecodeError, DecodeResult};

/// Maximum encoded size of a `u64` varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Maps a signed value onto an unsigned one so small magnitudes stay small.
#[inline]
pub const fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub const fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Appends `value` as an unsigned LEB128 varint.
#[inline]
pub fn put_uvarint(buf: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Reads an unsigned LEB128 varint.
pub fn get_uvarint(buf: &mut impl Buf) -> DecodeResult<u64> {
    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(DecodeError::new("truncated varint"));
        }
        let byte = buf.get_u8();
        if shift == 63 && byte > 1 {
            return Err(DecodeError::new("varint overflows 64 bits"));
        }
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Appends `value` as a zig-zag varint.
#[inline]
pub fn put_varint(buf: &mut impl BufMut, value: i64) {
    put_uvarint(buf, zigzag_encode(value));
}

/// Reads a zig-zag varint.
#[inline]
pub fn get_varint(buf: &mut impl Buf) -> DecodeResult<i64> {
    get_uvarint(buf).map(zigzag_decode)
}

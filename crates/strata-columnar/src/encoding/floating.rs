//! Floating-point column chunks: raw little-endian IEEE-754 bits.
//!
//! Values are stored by bit pattern, so NaN payloads, signed zeros and
//! infinities survive unchanged.

use bytes::{Buf, BufMut, Bytes};

use super::nulls::{Presence, PresenceBuilder};
use super::{DecodeError, DecodeResult};

/// Buffers 64-bit floats for one column.
#[derive(Debug, Clone, Default)]
pub struct FloatEncoder {
    presence: PresenceBuilder,
    values: Vec<u8>,
}

impl FloatEncoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers one row.
    #[inline]
    pub fn push(&mut self, value: Option<f64>) {
        self.presence.push(value.is_some());
        if let Some(v) = value {
            self.values.put_u64_le(v.to_bits());
        }
    }

    /// Buffered rows.
    pub fn len(&self) -> usize {
        self.presence.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.presence.is_empty()
    }

    /// Null rows buffered.
    pub fn null_count(&self) -> usize {
        self.presence.null_count()
    }

    /// Bytes the buffered chunk will occupy once encoded.
    pub fn encoded_len(&self) -> usize {
        self.presence.encoded_len() + self.values.len()
    }

    /// Encodes the buffered rows into `out` and resets the encoder.
    pub fn finish_into(&mut self, out: &mut Vec<u8>) {
        self.presence.write_to(out);
        out.extend_from_slice(&self.values);
        self.presence.clear();
        self.values.clear();
    }
}

/// Decodes a floating-point chunk of `rows` rows.
pub fn decode(chunk: Bytes, rows: usize) -> DecodeResult<Vec<Option<f64>>> {
    let mut buf = chunk;
    let presence = Presence::read(&mut buf, rows)?;
    let expected = presence.present_count() * 8;
    if buf.remaining() != expected {
        return Err(DecodeError::new(format!(
            "expected {} value bytes, found {}",
            expected,
            buf.remaining()
        )));
    }
    let mut values = Vec::with_capacity(rows);
    for row in 0..rows {
        if presence.is_present(row) {
            values.push(Some(f64::from_bits(buf.get_u64_le())));
        } else {
            values.push(None);
        }
    }
    Ok(values)
}

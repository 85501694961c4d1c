//! Integral column chunks: zig-zag varints for present rows.

use bytes::{Buf, Bytes};

use super::nulls::{Presence, PresenceBuilder};
use super::varint::{get_varint, put_varint};
use super::{DecodeError, DecodeResult};

/// Buffers 64-bit signed integers for one column.
#[derive(Debug, Clone, Default)]
pub struct IntegralEncoder {
    presence: PresenceBuilder,
    values: Vec<u8>,
}

impl IntegralEncoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers one row.
    #[inline]
    pub fn push(&mut self, value: Option<i64>) {
        self.presence.push(value.is_some());
        if let Some(v) = value {
            put_varint(&mut self.values, v);
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

/// Decodes an integral chunk of `rows` rows.
pub fn decode(chunk: Bytes, rows: usize) -> DecodeResult<Vec<Option<i64>>> {
    let mut buf = chunk;
    let presence = Presence::read(&mut buf, rows)?;
    let mut values = Vec::with_capacity(rows);
    for row in 0..rows {
        if presence.is_present(row) {
            values.push(Some(get_varint(&mut buf)?));
        } else {
            values.push(None);
        }
    }
    if buf.has_remaining() {
        return Err(DecodeError::trailing(buf.remaining()));
    }
    Ok(values)
}

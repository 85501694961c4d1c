//! Text column chunks.

use bytes::Bytes;

use super::varlen::{self, VarLenEncoder};
use super::{DecodeError, DecodeResult};

/// Buffers UTF-8 strings for one column.
#[derive(Debug, Clone, Default)]
pub struct TextEncoder {
    inner: VarLenEncoder,
}

impl TextEncoder {
    /// Creates an encoder whose value buffer starts at `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: VarLenEncoder::with_capacity(capacity),
        }
    }

    /// Buffers one row.
    #[inline]
    pub fn push(&mut self, value: Option<&str>) {
        self.inner.push(value.map(str::as_bytes));
    }

    /// Buffered rows.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Null rows buffered.
    pub fn null_count(&self) -> usize {
        self.inner.null_count()
    }

    /// Bytes the buffered chunk will occupy once encoded.
    pub fn encoded_len(&self) -> usize {
        self.inner.encoded_len()
    }

    /// Encodes the buffered rows into `out` and resets the encoder.
    pub fn finish_into(&mut self, out: &mut Vec<u8>) {
        self.inner.finish_into(out);
    }
}

/// Decodes a text chunk, checking every value is valid UTF-8.
pub fn decode(chunk: Bytes, rows: usize) -> DecodeResult<Vec<Option<Bytes>>> {
    let values = varlen::decode(chunk, rows)?;
    for (row, value) in values.iter().enumerate() {
        if let Some(bytes) = value {
            if let Err(e) = std::str::from_utf8(bytes) {
                return Err(DecodeError::new(format!("row {} is not UTF-8: {}", row, e)));
            }
        }
    }
    Ok(values)
}

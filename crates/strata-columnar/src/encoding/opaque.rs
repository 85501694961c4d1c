//! Opaque byte-string column chunks.

use bytes::Bytes;

use super::varlen::{self, VarLenEncoder};
use super::DecodeResult;

/// Buffers raw byte strings for one column.
#[derive(Debug, Clone, Default)]
pub struct OpaqueEncoder {
    inner: VarLenEncoder,
}

impl OpaqueEncoder {
    /// Creates an encoder whose value buffer starts at `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: VarLenEncoder::with_capacity(capacity),
        }
    }

    /// Buffers one row.
    #[inline]
    pub fn push(&mut self, value: Option<&[u8]>) {
        self.inner.push(value);
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

/// Decodes an opaque chunk.
pub fn decode(chunk: Bytes, rows: usize) -> DecodeResult<Vec<Option<Bytes>>> {
    varlen::decode(chunk, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arbitrary_bytes() {
        let all: Vec<u8> = (0..=255u8).collect();
        let mut encoder = OpaqueEncoder::with_capacity(0);
        encoder.push(Some(&all[..]));
        encoder.push(None);
        encoder.push(Some(&[0x01u8, 0x02, 0x19, 0x80][..]));
        let mut out = Vec::new();
        encoder.finish_into(&mut out);

        let decoded = decode(Bytes::from(out), 3).unwrap();
        assert_eq!(decoded[0].as_deref(), Some(&all[..]));
        assert_eq!(decoded[1], None);
        assert_eq!(decoded[2].as_deref(), Some(&[0x01u8, 0x02, 0x19, 0x80][..]));
    }
}

//! Boolean column chunks: bit-packed values for present rows.

use bytes::{Buf, Bytes};

use super::nulls::{PackedBits, Presence, PresenceBuilder};
use super::{DecodeError, DecodeResult};

/// Buffers booleans for one column.
#[derive(Debug, Clone, Default)]
pub struct BooleanEncoder {
    presence: PresenceBuilder,
    values: PackedBits,
}

impl BooleanEncoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers one row.
    #[inline]
    pub fn push(&mut self, value: Option<bool>) {
        self.presence.push(value.is_some());
        if let Some(v) = value {
            self.values.push(v);
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
        self.presence.encoded_len() + self.values.as_bytes().len()
    }

    /// Encodes the buffered rows into `out` and resets the encoder.
    pub fn finish_into(&mut self, out: &mut Vec<u8>) {
        self.presence.write_to(out);
        out.extend_from_slice(self.values.as_bytes());
        self.presence.clear();
        self.values.clear();
    }
}

/// Decodes a boolean chunk of `rows` rows.
pub fn decode(chunk: Bytes, rows: usize) -> DecodeResult<Vec<Option<bool>>> {
    let mut buf = chunk;
    let presence = Presence::read(&mut buf, rows)?;
    let bits = PackedBits::read(&mut buf, presence.present_count())?;
    if buf.has_remaining() {
        return Err(DecodeError::trailing(buf.remaining()));
    }

    let mut next = 0;
    let mut values = Vec::with_capacity(rows);
    for row in 0..rows {
        if presence.is_present(row) {
            values.push(Some(bits.get(next)));
            next += 1;
        } else {
            values.push(None);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let rows: Vec<Option<bool>> = (0..37)
            .map(|i| match i % 3 {
                0 => Some(true),
                1 => None,
                _ => Some(false),
            })
            .collect();

        let mut encoder = BooleanEncoder::new();
        for row in &rows {
            encoder.push(*row);
        }
        assert_eq!(encoder.null_count(), 12);
        let mut out = Vec::new();
        encoder.finish_into(&mut out);

        assert_eq!(decode(Bytes::from(out), rows.len()).unwrap(), rows);
    }

    #[test]
    fn test_packed_size() {
        let mut encoder = BooleanEncoder::new();
        for i in 0..16 {
            encoder.push(Some(i % 2 == 0));
        }
        assert_eq!(encoder.encoded_len(), 1 + 2);
    }
}

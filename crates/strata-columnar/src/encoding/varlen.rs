//! Length-prefixed column chunks shared by text and opaque columns.
//!
//! Layout: presence section, one varint length per present row, then the
//! concatenated value bytes.

use bytes::{Buf, BufMut, Bytes};

use super::nulls::{Presence, PresenceBuilder};
use super::varint::{get_uvarint, put_uvarint};
use super::{DecodeError, DecodeResult};

/// Buffers variable-length values for one column.
#[derive(Debug, Clone, Default)]
pub struct VarLenEncoder {
    presence: PresenceBuilder,
    lengths: Vec<u8>,
    data: Vec<u8>,
}

impl VarLenEncoder {
    /// Creates an encoder whose value buffer starts at `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            presence: PresenceBuilder::new(),
            lengths: Vec::new(),
            data: Vec::with_capacity(capacity),
        }
    }

    /// Buffers one row.
    pub fn push(&mut self, value: Option<&[u8]>) {
        match value {
            Some(bytes) => {
                self.presence.push(true);
                put_uvarint(&mut self.lengths, bytes.len() as u64);
                self.data.extend_from_slice(bytes);
            }
            None => self.presence.push(false),
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
        self.presence.encoded_len() + self.lengths.len() + self.data.len()
    }

    /// Encodes the buffered rows into `out` and resets the encoder.
    pub fn finish_into(&mut self, out: &mut impl BufMut) {
        self.presence.write_to(out);
        out.put_slice(&self.lengths);
        out.put_slice(&self.data);
        self.presence.clear();
        self.lengths.clear();
        self.data.clear();
    }
}

/// Decodes a length-prefixed chunk of `rows` rows.
///
/// Values are returned as slices of `chunk`, no bytes are copied.
pub fn decode(chunk: Bytes, rows: usize) -> DecodeResult<Vec<Option<Bytes>>> {
    let mut buf = chunk;
    let presence = Presence::read(&mut buf, rows)?;

    let mut lengths = Vec::with_capacity(presence.present_count());
    let mut total = 0usize;
    for _ in 0..presence.present_count() {
        let len = usize::try_from(get_uvarint(&mut buf)?)
            .map_err(|_| DecodeError::new("value length overflows usize"))?;
        total = total
            .checked_add(len)
            .ok_or_else(|| DecodeError::new("value lengths overflow"))?;
        lengths.push(len);
    }

    if buf.remaining() != total {
        return Err(DecodeError::new(format!(
            "value section holds {} bytes, lengths sum to {}",
            buf.remaining(),
            total
        )));
    }

    let mut lengths = lengths.into_iter();
    let mut values = Vec::with_capacity(rows);
    for row in 0..rows {
        if presence.is_present(row) {
            let len = lengths.next().unwrap_or(0);
            values.push(Some(buf.split_to(len)));
        } else {
            values.push(None);
        }
    }
    Ok(values)
}

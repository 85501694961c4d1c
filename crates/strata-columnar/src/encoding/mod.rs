//! Physical column encodings.
//!
//! Each storage type has an encoder that buffers one column of a stripe and
//! a decoder that turns the stored chunk back into per-row values. Every
//! chunk starts with a presence section (see [`nulls`]); null rows add
//! nothing to the value section.

pub mod boolean;
pub mod floating;
pub mod integral;
pub mod nulls;
pub mod opaque;
pub mod text;
pub mod varint;
pub mod varlen;

use bytes::Bytes;
use strata_common::types::StorageType;
use thiserror::Error;

use crate::error::{StorageError, StorageResult};

pub use boolean::BooleanEncoder;
pub use floating::FloatEncoder;
pub use integral::IntegralEncoder;
pub use opaque::OpaqueEncoder;
pub use text::TextEncoder;

/// A malformed column chunk.
///
/// Carries no location; the reader wraps it into a `CorruptFile` error
/// naming the file, stripe and column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DecodeError(String);

impl DecodeError {
    /// Creates a decode error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// Creates an error for bytes left over after the last value.
    pub fn trailing(remaining: usize) -> Self {
        Self(format!("{} trailing bytes after last value", remaining))
    }
}

/// Result type for chunk decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// One cell handed to a column encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// Absent value, legal for every storage type.
    Null,
    /// 64-bit signed integer.
    Integral(i64),
    /// 64-bit float.
    FloatingPoint(f64),
    /// Boolean.
    Boolean(bool),
    /// UTF-8 text.
    Text(&'a str),
    /// Raw bytes.
    Opaque(&'a [u8]),
}

impl Value<'_> {
    /// The storage type this value belongs to, `None` for nulls.
    pub fn storage_type(&self) -> Option<StorageType> {
        match self {
            Self::Null => None,
            Self::Integral(_) => Some(StorageType::Integral),
            Self::FloatingPoint(_) => Some(StorageType::FloatingPoint),
            Self::Boolean(_) => Some(StorageType::Boolean),
            Self::Text(_) => Some(StorageType::Text),
            Self::Opaque(_) => Some(StorageType::Opaque),
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Buffering encoder for one column.
#[derive(Debug, Clone)]
pub enum ColumnEncoder {
    /// Integral column.
    Integral(IntegralEncoder),
    /// Text column.
    Text(TextEncoder),
    /// Opaque column.
    Opaque(OpaqueEncoder),
    /// Floating-point column.
    FloatingPoint(FloatEncoder),
    /// Boolean column.
    Boolean(BooleanEncoder),
}

impl ColumnEncoder {
    /// Creates an encoder for `storage_type`.
    ///
    /// `initial_capacity` sizes the value buffer of variable-length columns.
    pub fn new(storage_type: StorageType, initial_capacity: usize) -> Self {
        match storage_type {
            StorageType::Integral => Self::Integral(IntegralEncoder::new()),
            StorageType::Text => Self::Text(TextEncoder::with_capacity(initial_capacity)),
            StorageType::Opaque => Self::Opaque(OpaqueEncoder::with_capacity(initial_capacity)),
            StorageType::FloatingPoint => Self::FloatingPoint(FloatEncoder::new()),
            StorageType::Boolean => Self::Boolean(BooleanEncoder::new()),
        }
    }

    /// Storage type of the column.
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::Integral(_) => StorageType::Integral,
            Self::Text(_) => StorageType::Text,
            Self::Opaque(_) => StorageType::Opaque,
            Self::FloatingPoint(_) => StorageType::FloatingPoint,
            Self::Boolean(_) => StorageType::Boolean,
        }
    }

    /// Buffers one row.
    ///
    /// Nulls are accepted by every column; any other value must match the
    /// column's storage type.
    pub fn append(&mut self, value: Value<'_>) -> StorageResult<()> {
        match (self, value) {
            (Self::Integral(e), Value::Null) => e.push(None),
            (Self::Text(e), Value::Null) => e.push(None),
            (Self::Opaque(e), Value::Null) => e.push(None),
            (Self::FloatingPoint(e), Value::Null) => e.push(None),
            (Self::Boolean(e), Value::Null) => e.push(None),
            (Self::Integral(e), Value::Integral(v)) => e.push(Some(v)),
            (Self::Text(e), Value::Text(v)) => e.push(Some(v)),
            (Self::Opaque(e), Value::Opaque(v)) => e.push(Some(v)),
            (Self::FloatingPoint(e), Value::FloatingPoint(v)) => e.push(Some(v)),
            (Self::Boolean(e), Value::Boolean(v)) => e.push(Some(v)),
            (encoder, value) => {
                return Err(StorageError::schema_mismatch(format!(
                    "cannot append {:?} to a {} column",
                    value,
                    encoder.storage_type()
                )))
            }
        }
        Ok(())
    }

    /// Buffered rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Integral(e) => e.len(),
            Self::Text(e) => e.len(),
            Self::Opaque(e) => e.len(),
            Self::FloatingPoint(e) => e.len(),
            Self::Boolean(e) => e.len(),
        }
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Null rows buffered.
    pub fn null_count(&self) -> usize {
        match self {
            Self::Integral(e) => e.null_count(),
            Self::Text(e) => e.null_count(),
            Self::Opaque(e) => e.null_count(),
            Self::FloatingPoint(e) => e.null_count(),
            Self::Boolean(e) => e.null_count(),
        }
    }

    /// Bytes the buffered chunk will occupy once encoded.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Integral(e) => e.encoded_len(),
            Self::Text(e) => e.encoded_len(),
            Self::Opaque(e) => e.encoded_len(),
            Self::FloatingPoint(e) => e.encoded_len(),
            Self::Boolean(e) => e.encoded_len(),
        }
    }

    /// Encodes the buffered rows as one chunk and resets the encoder.
    pub fn finish(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        match self {
            Self::Integral(e) => e.finish_into(&mut out),
            Self::Text(e) => e.finish_into(&mut out),
            Self::Opaque(e) => e.finish_into(&mut out),
            Self::FloatingPoint(e) => e.finish_into(&mut out),
            Self::Boolean(e) => e.finish_into(&mut out),
        }
        out
    }
}

/// One column of one stripe, decoded.
///
/// Variable-length values are slices of the decompressed stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedColumn {
    /// Integral values.
    Integral(Vec<Option<i64>>),
    /// Text values, already checked to be UTF-8.
    Text(Vec<Option<Bytes>>),
    /// Opaque values.
    Opaque(Vec<Option<Bytes>>),
    /// Floating-point values.
    FloatingPoint(Vec<Option<f64>>),
    /// Boolean values.
    Boolean(Vec<Option<bool>>),
}

impl DecodedColumn {
    /// Decodes a chunk of `rows` rows stored as `storage_type`.
    pub fn decode(storage_type: StorageType, chunk: Bytes, rows: usize) -> DecodeResult<Self> {
        Ok(match storage_type {
            StorageType::Integral => Self::Integral(integral::decode(chunk, rows)?),
            StorageType::Text => Self::Text(text::decode(chunk, rows)?),
            StorageType::Opaque => Self::Opaque(opaque::decode(chunk, rows)?),
            StorageType::FloatingPoint => Self::FloatingPoint(floating::decode(chunk, rows)?),
            StorageType::Boolean => Self::Boolean(boolean::decode(chunk, rows)?),
        })
    }

    /// Storage type of the column.
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::Integral(_) => StorageType::Integral,
            Self::Text(_) => StorageType::Text,
            Self::Opaque(_) => StorageType::Opaque,
            Self::FloatingPoint(_) => StorageType::FloatingPoint,
            Self::Boolean(_) => StorageType::Boolean,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Integral(v) => v.len(),
            Self::Text(v) | Self::Opaque(v) => v.len(),
            Self::FloatingPoint(v) => v.len(),
            Self::Boolean(v) => v.len(),
        }
    }

    /// Returns true if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

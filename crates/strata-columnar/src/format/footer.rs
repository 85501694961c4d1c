//! File footer: schema, row count and stripe directory.
//!
//! Layout (little-endian):
//! - flags: 1 byte
//! - row_count: 8 bytes
//! - column_count: 4 bytes, then per declared column: id (8), type tag (1)
//! - sample weight column id: 8 bytes, only with `HAS_SAMPLE_WEIGHT`
//! - stripe_count: 4 bytes, then per stripe: row_count (4) and one stream
//!   entry per stored column: codec (1), offset (8), stored_len (8),
//!   raw_len (8), checksum (4)

use std::path::Path;

use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use strata_common::constants::{FILE_HEADER_SIZE, MAX_STREAM_SIZE};
use strata_common::types::{ColumnId, StorageType};

use crate::codec::CompressionKind;
use crate::error::{StorageError, StorageResult};
use crate::schema::{ColumnDescriptor, ColumnSchema};

bitflags! {
    /// Footer flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FooterFlags: u8 {
        /// The last stored column holds per-row sample weights.
        const HAS_SAMPLE_WEIGHT = 0b0000_0001;
    }
}

/// Location and encoding of one column stream within a stripe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    /// Codec the stream was compressed with.
    pub codec: CompressionKind,
    /// Absolute file offset of the stored bytes.
    pub offset: u64,
    /// Stored (possibly compressed) length.
    pub stored_len: u64,
    /// Decompressed length.
    pub raw_len: u64,
    /// CRC32 of the stored bytes.
    pub checksum: u32,
}

impl StreamInfo {
    const SIZE: usize = 1 + 8 + 8 + 8 + 4;

    fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.codec.as_u8());
        buf.put_u64_le(self.offset);
        buf.put_u64_le(self.stored_len);
        buf.put_u64_le(self.raw_len);
        buf.put_u32_le(self.checksum);
    }

    fn deserialize(buf: &mut impl Buf, path: &Path) -> StorageResult<Self> {
        let tag = buf.get_u8();
        let codec = CompressionKind::from_u8(tag)
            .ok_or_else(|| StorageError::corrupt(path, format!("unknown codec tag {}", tag)))?;
        Ok(Self {
            codec,
            offset: buf.get_u64_le(),
            stored_len: buf.get_u64_le(),
            raw_len: buf.get_u64_le(),
            checksum: buf.get_u32_le(),
        })
    }

    /// End offset of the stored bytes.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.stored_len)
    }
}

/// Directory entry of one stripe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeInfo {
    /// Rows in the stripe.
    pub row_count: u32,
    /// One stream per stored column, in column order.
    pub streams: Vec<StreamInfo>,
}

impl StripeInfo {
    /// Total stored bytes of the stripe.
    pub fn stored_len(&self) -> u64 {
        self.streams.iter().map(|s| s.stored_len).sum()
    }

    /// Total decompressed bytes of the stripe.
    pub fn raw_len(&self) -> u64 {
        self.streams.iter().map(|s| s.raw_len).sum()
    }
}

/// Decoded file footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    /// Footer flags.
    pub flags: FooterFlags,
    /// Total rows in the file.
    pub row_count: u64,
    /// Schema the file was written with.
    pub schema: ColumnSchema,
    /// Stripe directory, in file order.
    pub stripes: Vec<StripeInfo>,
}

impl Footer {
    /// Creates a footer for `schema` with no stripes.
    pub fn new(schema: ColumnSchema) -> Self {
        let mut flags = FooterFlags::empty();
        if schema.sample_weight_column().is_some() {
            flags |= FooterFlags::HAS_SAMPLE_WEIGHT;
        }
        Self {
            flags,
            row_count: 0,
            schema,
            stripes: Vec::new(),
        }
    }

    /// Appends a stripe to the directory.
    pub fn push_stripe(&mut self, stripe: StripeInfo) {
        self.row_count += u64::from(stripe.row_count);
        self.stripes.push(stripe);
    }

    /// Serializes the footer.
    pub fn serialize(&self) -> Bytes {
        let columns = self.schema.columns();
        let stream_count = self.schema.physical_column_count();
        let size = 1
            + 8
            + 4
            + columns.len() * 9
            + 8
            + 4
            + self.stripes.len() * (4 + stream_count * StreamInfo::SIZE);
        let mut buf = BytesMut::with_capacity(size);

        buf.put_u8(self.flags.bits());
        buf.put_u64_le(self.row_count);
        buf.put_u32_le(columns.len() as u32);
        for column in columns {
            buf.put_u64_le(column.id.as_u64());
            buf.put_u8(column.storage_type.as_u8());
        }
        if let Some(id) = self.schema.sample_weight_column() {
            buf.put_u64_le(id.as_u64());
        }
        buf.put_u32_le(self.stripes.len() as u32);
        for stripe in &self.stripes {
            buf.put_u32_le(stripe.row_count);
            for stream in &stripe.streams {
                stream.serialize(&mut buf);
            }
        }
        buf.freeze()
    }

    /// Parses a footer read from `path`.
    ///
    /// `data_end` is the offset where the footer starts; every stream must
    /// lie between the file header and that offset.
    pub fn deserialize(bytes: &[u8], data_end: u64, path: &Path) -> StorageResult<Self> {
        let mut buf = bytes;
        let truncated = || StorageError::corrupt(path, "footer is truncated");

        if buf.remaining() < 1 + 8 + 4 {
            return Err(truncated());
        }
        let flags = FooterFlags::from_bits(buf.get_u8())
            .ok_or_else(|| StorageError::corrupt(path, "unknown footer flags"))?;
        let row_count = buf.get_u64_le();
        let column_count = buf.get_u32_le() as usize;

        if buf.remaining() < column_count.saturating_mul(9) {
            return Err(truncated());
        }
        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            let id = ColumnId::new(buf.get_u64_le());
            let storage_type = StorageType::from_u8(buf.get_u8())
                .map_err(|e| StorageError::corrupt(path, e.to_string()))?;
            columns.push(ColumnDescriptor::new(id, storage_type));
        }
        let mut schema = ColumnSchema::from_columns(columns)
            .map_err(|e| StorageError::corrupt(path, e.to_string()))?;

        if flags.contains(FooterFlags::HAS_SAMPLE_WEIGHT) {
            if buf.remaining() < 8 {
                return Err(truncated());
            }
            schema = schema
                .with_sample_weight_column(ColumnId::new(buf.get_u64_le()))
                .map_err(|e| StorageError::corrupt(path, e.to_string()))?;
        }

        if buf.remaining() < 4 {
            return Err(truncated());
        }
        let stripe_count = buf.get_u32_le() as usize;
        let stream_count = schema.physical_column_count();
        let stripe_size = 4 + stream_count * StreamInfo::SIZE;
        if buf.remaining() != stripe_count.saturating_mul(stripe_size) {
            return Err(StorageError::corrupt(
                path,
                format!(
                    "stripe directory of {} stripes needs {} bytes, found {}",
                    stripe_count,
                    stripe_count.saturating_mul(stripe_size),
                    buf.remaining()
                ),
            ));
        }

        let mut stripes = Vec::with_capacity(stripe_count);
        let mut rows_seen = 0u64;
        for index in 0..stripe_count {
            let stripe_rows = buf.get_u32_le();
            if stripe_rows == 0 {
                return Err(StorageError::corrupt(
                    path,
                    format!("stripe {} is empty", index),
                ));
            }
            rows_seen += u64::from(stripe_rows);
            let mut streams = Vec::with_capacity(stream_count);
            for column in 0..stream_count {
                let stream = StreamInfo::deserialize(&mut buf, path)?;
                if stream.offset < FILE_HEADER_SIZE as u64 || stream.end() > data_end {
                    return Err(StorageError::corrupt(
                        path,
                        format!(
                            "stripe {} column {} lies outside the data region",
                            index, column
                        ),
                    ));
                }
                if stream.raw_len > MAX_STREAM_SIZE {
                    return Err(StorageError::corrupt(
                        path,
                        format!(
                            "stripe {} column {} claims {} decoded bytes",
                            index, column, stream.raw_len
                        ),
                    ));
                }
                streams.push(stream);
            }
            stripes.push(StripeInfo {
                row_count: stripe_rows,
                streams,
            });
        }

        if rows_seen != row_count {
            return Err(StorageError::corrupt(
                path,
                format!(
                    "footer claims {} rows but stripes hold {}",
                    row_count, rows_seen
                ),
            ));
        }

        Ok(Self {
            flags,
            row_count,
            schema,
            stripes,
        })
    }
}

//! # strata-columnar
//!
//! Self-describing columnar files for query-produced rows.
//!
//! This crate provides the write and read paths of a single columnar file:
//!
//! - **RowSink**: row-at-a-time writer facade bound to a [`ColumnSchema`]
//! - **FileWriter**: buffers column encoders and lays out stripes
//! - **BatchReader**: forward-only cursor decoding stripes into vectors
//! - **TypedVector**: fixed-capacity, per-column read buffers
//! - **Codecs**: explicit, constructor-injected stream compression
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ RowSink                                                      │
//! │   begin_record → append_* / append_null → finish_record      │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ complete rows
//! ┌───────────────────────────▼──────────────────────────────────┐
//! │ FileWriter                                                   │
//! │   ColumnEncoder × columns → stripe → codec → stream + CRC32  │
//! │   close: footer + tail (+ fsync)                             │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ one file, no sidecars
//! ┌───────────────────────────▼──────────────────────────────────┐
//! │ BatchReader                                                  │
//! │   open: header, tail, footer → next_batch → read_vector      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use strata_columnar::{
//!     BatchReader, CodecRegistry, ColumnSchema, ReaderConfig, RowSink, TypedVector,
//!     WriterConfig,
//! };
//! use strata_common::types::{ColumnId, StorageType};
//!
//! # fn main() -> strata_columnar::StorageResult<()> {
//! let codecs = Arc::new(CodecRegistry::builtin());
//! let schema = ColumnSchema::new(vec![ColumnId::new(1)], vec![StorageType::FloatingPoint])?;
//!
//! let mut sink = RowSink::create(schema, "/tmp/demo.strata", WriterConfig::default(), codecs.clone())?;
//! sink.begin_record(1)?;
//! sink.append_double(f64::NAN)?;
//! sink.finish_record()?;
//! sink.close()?;
//!
//! let mut reader = BatchReader::open("/tmp/demo.strata", ReaderConfig::default(), codecs)?;
//! let mut doubles = TypedVector::new(StorageType::FloatingPoint);
//! while let Some(rows) = reader.next_batch()? {
//!     reader.read_vector(0, &mut doubles)?;
//!     assert_eq!(doubles.len(), rows);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checksum;
pub mod codec;
pub mod config;
pub mod encoding;
pub mod error;
pub mod format;
pub mod reader;
pub mod schema;
pub mod sink;
pub mod vector;
pub mod writer;

pub use codec::{Codec, CodecRegistry, CompressionKind, ThreadCodecScope};
pub use config::{ReaderConfig, StrataConfig, WriterConfig};
pub use encoding::{ColumnEncoder, Value};
pub use error::{StorageError, StorageResult};
pub use reader::BatchReader;
pub use schema::{ColumnDescriptor, ColumnSchema};
pub use sink::{RowSink, SinkState};
pub use vector::{BooleanVector, DoubleVector, LongVector, SliceVector, TypedVector};
pub use writer::{FileSummary, FileWriter};

//! Subcommand implementations.
//!
//! Every command works on one file through the public reader and sink APIs
//! and returns plain data; rendering lives in the formatter.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use strata_columnar::{
    BatchReader, CodecRegistry, ColumnSchema, ReaderConfig, RowSink, TypedVector, WriterConfig,
};
use strata_common::types::{ColumnId, StorageType};
use tracing::{debug, info};

/// One stored column of a file.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnReport {
    /// Position in stream order.
    pub index: usize,
    /// Column id.
    pub id: u64,
    /// Storage type name.
    pub storage_type: String,
    /// `data` or `sample_weight`.
    pub role: &'static str,
}

/// One stripe of a file.
#[derive(Debug, Clone, Serialize)]
pub struct StripeReport {
    /// Stripe number.
    pub index: usize,
    /// Rows in the stripe.
    pub rows: u32,
    /// Stored bytes across all streams.
    pub stored_bytes: u64,
    /// Decompressed bytes across all streams.
    pub raw_bytes: u64,
    /// Codecs used by the streams, in column order.
    pub codecs: Vec<String>,
}

/// Output of `inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// File path.
    pub path: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Total rows.
    pub total_rows: u64,
    /// Stored columns.
    pub columns: Vec<ColumnReport>,
    /// Stripe directory.
    pub stripes: Vec<StripeReport>,
}

/// A single decoded value, owned for printing.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Null.
    Null,
    /// Integral value.
    Integral(i64),
    /// Floating-point value.
    FloatingPoint(f64),
    /// Boolean value.
    Boolean(bool),
    /// Text value.
    Text(String),
    /// Opaque value.
    Opaque(Vec<u8>),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integral(v) => write!(f, "{}", v),
            Self::FloatingPoint(v) => write!(f, "{}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
            Self::Opaque(v) => {
                f.write_str("0x")?;
                for byte in v {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// Output of `dump`.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    /// Column headers, `<id>:<type>`.
    pub columns: Vec<String>,
    /// Rows in file order.
    pub rows: Vec<Vec<CellValue>>,
    /// Total rows in the file, which may exceed `rows.len()`.
    pub total_rows: u64,
}

/// Output of `verify`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    /// File path.
    pub path: String,
    /// Rows decoded.
    pub rows: u64,
    /// Batches decoded.
    pub batches: u64,
    /// Column vectors decoded.
    pub vectors: u64,
}

/// Output of `generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    /// File path.
    pub path: String,
    /// Rows written.
    pub rows: u64,
    /// Stripes written.
    pub stripes: usize,
    /// Final file size.
    pub file_size: u64,
}

fn codecs() -> Arc<CodecRegistry> {
    Arc::new(CodecRegistry::builtin())
}

fn open(path: &Path, config: &ReaderConfig) -> Result<BatchReader> {
    BatchReader::open(path, config.clone(), codecs())
        .with_context(|| format!("cannot open {}", path.display()))
}

/// Describes schema, row count and stripes without decoding any data.
pub fn inspect(path: &Path, config: &ReaderConfig) -> Result<FileReport> {
    let reader = open(path, config)?;
    let file_size = std::fs::metadata(path)?.len();
    let weight_index = reader.sample_weight_column_index();

    let columns = (0..reader.column_count())
        .filter_map(|index| {
            Some(ColumnReport {
                index,
                id: reader.column_id(index)?.as_u64(),
                storage_type: reader.storage_type(index)?.to_string(),
                role: if Some(index) == weight_index {
                    "sample_weight"
                } else {
                    "data"
                },
            })
        })
        .collect();

    let stripes = reader
        .stripes()
        .iter()
        .enumerate()
        .map(|(index, stripe)| StripeReport {
            index,
            rows: stripe.row_count,
            stored_bytes: stripe.stored_len(),
            raw_bytes: stripe.raw_len(),
            codecs: stripe.streams.iter().map(|s| s.codec.to_string()).collect(),
        })
        .collect();

    Ok(FileReport {
        path: path.display().to_string(),
        file_size,
        total_rows: reader.total_row_count(),
        columns,
        stripes,
    })
}

/// Decodes up to `limit` rows.
pub fn dump(path: &Path, config: &ReaderConfig, limit: Option<usize>) -> Result<RowSet> {
    let mut reader = open(path, config)?;
    let limit = limit.unwrap_or(usize::MAX);

    let mut vectors: Vec<TypedVector> = Vec::with_capacity(reader.column_count());
    let mut columns = Vec::with_capacity(reader.column_count());
    for index in 0..reader.column_count() {
        let (Some(id), Some(ty)) = (reader.column_id(index), reader.storage_type(index)) else {
            bail!("column {} missing from {}", index, path.display());
        };
        columns.push(format!("{}:{}", id, ty));
        vectors.push(TypedVector::new(ty));
    }

    let mut rows = Vec::new();
    while rows.len() < limit {
        let Some(batch_len) = reader.next_batch()? else {
            break;
        };
        for (index, vector) in vectors.iter_mut().enumerate() {
            reader.read_vector(index, vector)?;
        }
        let take = batch_len.min(limit - rows.len());
        for row in 0..take {
            rows.push(vectors.iter().map(|v| cell_at(v, row)).collect());
        }
        debug!(batch_len, position = reader.position(), "dumped batch");
    }

    Ok(RowSet {
        columns,
        rows,
        total_rows: reader.total_row_count(),
    })
}

/// Decodes every column of every batch, stopping at the first failure.
pub fn verify(path: &Path, config: &ReaderConfig) -> Result<VerifyReport> {
    let mut reader = open(path, config)?;
    let mut vectors: Vec<TypedVector> = (0..reader.column_count())
        .filter_map(|i| reader.storage_type(i))
        .map(TypedVector::new)
        .collect();

    let mut batches = 0u64;
    let mut vector_count = 0u64;
    while let Some(batch_len) = reader.next_batch()? {
        for (index, vector) in vectors.iter_mut().enumerate() {
            reader.read_vector(index, vector).with_context(|| {
                format!(
                    "column {} of batch ending at row {} is unreadable",
                    index,
                    reader.position()
                )
            })?;
            if vector.len() != batch_len {
                bail!(
                    "column {} returned {} rows for a batch of {}",
                    index,
                    vector.len(),
                    batch_len
                );
            }
            vector_count += 1;
        }
        batches += 1;
    }

    if reader.position() != reader.total_row_count() {
        bail!(
            "read {} rows but footer records {}",
            reader.position(),
            reader.total_row_count()
        );
    }

    Ok(VerifyReport {
        path: path.display().to_string(),
        rows: reader.position(),
        batches,
        vectors: vector_count,
    })
}

/// Writes a sample file covering every storage type.
///
/// Columns are ids 1..=5 (integral, text, opaque, floating point, boolean)
/// and every seventh row of each column is null.
pub fn generate(path: &Path, config: &WriterConfig, rows: u64) -> Result<GenerateReport> {
    let schema = ColumnSchema::new(
        (1..=5).map(ColumnId::new).collect(),
        vec![
            StorageType::Integral,
            StorageType::Text,
            StorageType::Opaque,
            StorageType::FloatingPoint,
            StorageType::Boolean,
        ],
    )?;
    let mut sink = RowSink::create(schema, path, config.clone(), codecs())?;

    for i in 0..rows {
        let n = i as i64;
        sink.begin_record(1)?;
        for column in 0..5u64 {
            if (i + column) % 7 == 0 {
                sink.append_null()?;
                continue;
            }
            match column {
                0 => sink.append_long(n * 31 - 1000)?,
                1 => sink.append_string(&format!("row-{}", i))?,
                2 => sink.append_bytes(&n.to_le_bytes()[..(i % 8) as usize + 1])?,
                3 => sink.append_double(n as f64 / 8.0)?,
                _ => sink.append_boolean(i % 2 == 0)?,
            }
        }
        sink.finish_record()?;
    }

    let summary = sink.close()?;
    info!(path = %summary.path.display(), rows = summary.row_count, "generated sample file");
    Ok(GenerateReport {
        path: summary.path.display().to_string(),
        rows: summary.row_count,
        stripes: summary.stripe_count,
        file_size: summary.file_size,
    })
}

fn cell_at(vector: &TypedVector, row: usize) -> CellValue {
    match vector {
        TypedVector::Integral(v) => v.get(row).map_or(CellValue::Null, CellValue::Integral),
        TypedVector::FloatingPoint(v) => v
            .get(row)
            .map_or(CellValue::Null, CellValue::FloatingPoint),
        TypedVector::Boolean(v) => v.get(row).map_or(CellValue::Null, CellValue::Boolean),
        TypedVector::Text(v) => v
            .get(row)
            .map_or(CellValue::Null, |b| {
                CellValue::Text(String::from_utf8_lossy(b).into_owned())
            }),
        TypedVector::Opaque(v) => v
            .get(row)
            .map_or(CellValue::Null, |b| CellValue::Opaque(b.to_vec())),
    }
}

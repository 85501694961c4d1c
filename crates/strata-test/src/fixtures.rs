//! Owned row values and whole-file helpers shared by the integration tests.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Once};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_columnar::{
    BatchReader, CodecRegistry, ColumnSchema, FileSummary, ReaderConfig, RowSink, StorageResult,
    TypedVector, WriterConfig,
};
use strata_common::types::{ColumnId, StorageType};

/// An owned cell value.
///
/// Floating-point values compare by bit pattern so NaN payloads and signed
/// zeros are checked exactly.
#[derive(Clone)]
pub enum OwnedValue {
    /// Null.
    Null,
    /// Integral.
    Integral(i64),
    /// Text.
    Text(String),
    /// Opaque.
    Opaque(Vec<u8>),
    /// Floating point.
    FloatingPoint(f64),
    /// Boolean.
    Boolean(bool),
}

impl PartialEq for OwnedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integral(a), Self::Integral(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => a == b,
            (Self::FloatingPoint(a), Self::FloatingPoint(b)) => a.to_bits() == b.to_bits(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for OwnedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Integral(v) => write!(f, "Integral({})", v),
            Self::Text(v) => write!(f, "Text({:?})", v),
            Self::Opaque(v) => write!(f, "Opaque({:02x?})", v),
            Self::FloatingPoint(v) => write!(f, "FloatingPoint({} / {:#018x})", v, v.to_bits()),
            Self::Boolean(v) => write!(f, "Boolean({})", v),
        }
    }
}

/// A row to write: its sample weight and one value per declared column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Sample weight passed to `begin_record`.
    pub weight: u64,
    /// Values in schema order.
    pub values: Vec<OwnedValue>,
}

impl Row {
    /// A row with weight 1.
    pub fn new(values: Vec<OwnedValue>) -> Self {
        Self { weight: 1, values }
    }

    /// A row with an explicit sample weight.
    pub fn weighted(weight: u64, values: Vec<OwnedValue>) -> Self {
        Self { weight, values }
    }
}

static INIT_LOGGING: Once = Once::new();

/// Installs a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; silent otherwise.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// The built-in codec set.
pub fn builtin_codecs() -> Arc<CodecRegistry> {
    Arc::new(CodecRegistry::builtin())
}

/// Writer settings for tests: small stripes are set per test, fsync is off.
pub fn test_writer_config() -> WriterConfig {
    WriterConfig::new().with_sync_on_close(false)
}

/// Builds a schema from `(id, type)` pairs.
pub fn schema(columns: &[(u64, StorageType)]) -> StorageResult<ColumnSchema> {
    ColumnSchema::new(
        columns.iter().map(|(id, _)| ColumnId::new(*id)).collect(),
        columns.iter().map(|(_, ty)| *ty).collect(),
    )
}

/// Five columns with ids 1, 2, 4, 6, 7.
pub fn scenario_a_schema() -> StorageResult<ColumnSchema> {
    schema(&[
        (1, StorageType::Integral),
        (2, StorageType::Text),
        (4, StorageType::Opaque),
        (6, StorageType::FloatingPoint),
        (7, StorageType::Boolean),
    ])
}

/// Three rows over [`scenario_a_schema`], with nulls and non-finite floats.
pub fn scenario_a_rows() -> Vec<Row> {
    use OwnedValue::*;
    vec![
        Row::new(vec![
            Integral(123),
            Text("hello".to_string()),
            Opaque(vec![0x00, 0xFE, 0xFF]),
            FloatingPoint(123.456),
            Boolean(true),
        ]),
        Row::new(vec![
            Null,
            Text("world".to_string()),
            Null,
            FloatingPoint(f64::INFINITY),
            Null,
        ]),
        Row::new(vec![
            Integral(456),
            Text("bye".to_string()),
            Opaque(vec![0x01, 0x02, 0x19, 0x80]),
            FloatingPoint(f64::NAN),
            Boolean(false),
        ]),
    ]
}

/// Generates `count` seeded rows over `schema`'s declared columns.
///
/// About one value in five is null. Row `i` carries its index in every
/// integral column so order can be checked after reading.
pub fn random_rows(schema: &ColumnSchema, count: usize, seed: u64) -> Vec<Row> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let values = schema
                .columns()
                .iter()
                .map(|column| {
                    if column.storage_type != StorageType::Integral && rng.gen_ratio(1, 5) {
                        return OwnedValue::Null;
                    }
                    match column.storage_type {
                        StorageType::Integral => OwnedValue::Integral(i as i64),
                        StorageType::Text => {
                            let len = rng.gen_range(0..24);
                            OwnedValue::Text((0..len).map(|_| rng.gen_range('a'..='z')).collect())
                        }
                        StorageType::Opaque => {
                            let len = rng.gen_range(0..16);
                            OwnedValue::Opaque((0..len).map(|_| rng.gen()).collect())
                        }
                        StorageType::FloatingPoint => {
                            OwnedValue::FloatingPoint(f64::from_bits(rng.gen()))
                        }
                        StorageType::Boolean => OwnedValue::Boolean(rng.gen()),
                    }
                })
                .collect();
            Row::new(values)
        })
        .collect()
}

/// Drives one row through the sink.
pub fn write_row(sink: &mut RowSink, row: &Row) -> StorageResult<()> {
    sink.begin_record(row.weight)?;
    for value in &row.values {
        match value {
            OwnedValue::Null => sink.append_null()?,
            OwnedValue::Integral(v) => sink.append_long(*v)?,
            OwnedValue::Text(v) => sink.append_string(v)?,
            OwnedValue::Opaque(v) => sink.append_bytes(v)?,
            OwnedValue::FloatingPoint(v) => sink.append_double(*v)?,
            OwnedValue::Boolean(v) => sink.append_boolean(*v)?,
        }
    }
    sink.finish_record()
}

/// Writes `rows` to a new file at `path` and closes it.
pub fn write_file(
    path: &Path,
    schema: ColumnSchema,
    rows: &[Row],
    config: WriterConfig,
    codecs: Arc<CodecRegistry>,
) -> StorageResult<FileSummary> {
    let mut sink = RowSink::create(schema, path, config, codecs)?;
    for row in rows {
        write_row(&mut sink, row)?;
    }
    sink.close()
}

/// The result of draining a reader.
#[derive(Debug, Default)]
pub struct ReadBack {
    /// Every stored column of every row, in file order.
    pub rows: Vec<Vec<OwnedValue>>,
    /// Length of each batch returned by `next_batch`.
    pub batch_sizes: Vec<usize>,
}

/// Reads every stored column of every batch.
pub fn read_all(
    path: &Path,
    config: ReaderConfig,
    codecs: Arc<CodecRegistry>,
) -> StorageResult<ReadBack> {
    let mut reader = BatchReader::open(path, config, codecs)?;
    drain(&mut reader)
}

/// Reads the remaining batches of an open reader.
pub fn drain(reader: &mut BatchReader) -> StorageResult<ReadBack> {
    let mut vectors: Vec<TypedVector> = (0..reader.column_count())
        .filter_map(|i| reader.storage_type(i))
        .map(TypedVector::new)
        .collect();

    let mut out = ReadBack::default();
    while let Some(len) = reader.next_batch()? {
        for (index, vector) in vectors.iter_mut().enumerate() {
            reader.read_vector(index, vector)?;
        }
        for row in 0..len {
            out.rows.push(vectors.iter().map(|v| value_at(v, row)).collect());
        }
        out.batch_sizes.push(len);
    }
    Ok(out)
}

/// Extracts one value from a filled vector.
pub fn value_at(vector: &TypedVector, row: usize) -> OwnedValue {
    match vector {
        TypedVector::Integral(v) => v.get(row).map_or(OwnedValue::Null, OwnedValue::Integral),
        TypedVector::FloatingPoint(v) => v
            .get(row)
            .map_or(OwnedValue::Null, OwnedValue::FloatingPoint),
        TypedVector::Boolean(v) => v.get(row).map_or(OwnedValue::Null, OwnedValue::Boolean),
        TypedVector::Text(v) => v
            .get_str(row)
            .map_or(OwnedValue::Null, |s| OwnedValue::Text(s.to_string())),
        TypedVector::Opaque(v) => v
            .get(row)
            .map_or(OwnedValue::Null, |b| OwnedValue::Opaque(b.to_vec())),
    }
}

/// Declared values of `rows`, for comparison with [`ReadBack::rows`].
pub fn expected_values(rows: &[Row]) -> Vec<Vec<OwnedValue>> {
    rows.iter().map(|r| r.values.clone()).collect()
}

/// Lists the names of every entry in `dir`, sorted.
pub fn dir_entries(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

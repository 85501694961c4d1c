//! Benchmark utilities and helpers.

use std::path::Path;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_columnar::{
    BatchReader, CodecRegistry, ColumnSchema, FileSummary, ReaderConfig, RowSink, StorageResult,
    TypedVector, WriterConfig,
};
use strata_common::types::{ColumnId, StorageType};

/// An owned row matching [`bench_schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct BenchRow {
    /// Column 1.
    pub id: Option<i64>,
    /// Column 2.
    pub name: Option<String>,
    /// Column 3.
    pub payload: Option<Vec<u8>>,
    /// Column 4.
    pub score: Option<f64>,
    /// Column 5.
    pub active: Option<bool>,
}

/// Five columns, one per storage type.
pub fn bench_schema() -> StorageResult<ColumnSchema> {
    ColumnSchema::new(
        (1..=5).map(ColumnId::new).collect(),
        vec![
            StorageType::Integral,
            StorageType::Text,
            StorageType::Opaque,
            StorageType::FloatingPoint,
            StorageType::Boolean,
        ],
    )
}

/// Generates random string data for benchmarks.
pub fn random_string(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generates `count` seeded rows; each value is null with probability `null_ratio`.
pub fn generate_rows(count: usize, null_ratio: f64) -> Vec<BenchRow> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            let mut present = || !rng.gen_bool(null_ratio);
            let (id_p, name_p, payload_p, score_p, active_p) =
                (present(), present(), present(), present(), present());
            let name_len = rng.gen_range(4..32);
            let payload_len = rng.gen_range(0..64);
            BenchRow {
                id: id_p.then(|| rng.gen_range(-1_000_000..1_000_000)),
                name: name_p.then(|| random_string(&mut rng, name_len)),
                payload: payload_p.then(|| (0..payload_len).map(|_| rng.gen()).collect()),
                score: score_p.then(|| rng.gen::<f64>() * 1000.0),
                active: active_p.then(|| rng.gen()),
            }
        })
        .collect()
}

/// Generates `count` sequential integers, which encode to short varints.
pub fn generate_sequential_longs(count: usize) -> Vec<i64> {
    (0..count as i64).collect()
}

/// Writes `rows` to `path` through a row sink.
pub fn write_rows(path: &Path, rows: &[BenchRow], config: WriterConfig) -> StorageResult<FileSummary> {
    let mut sink = RowSink::create(
        bench_schema()?,
        path,
        config,
        Arc::new(CodecRegistry::builtin()),
    )?;
    for row in rows {
        sink.begin_record(1)?;
        match row.id {
            Some(v) => sink.append_long(v)?,
            None => sink.append_null()?,
        }
        match &row.name {
            Some(v) => sink.append_string(v)?,
            None => sink.append_null()?,
        }
        match &row.payload {
            Some(v) => sink.append_bytes(v)?,
            None => sink.append_null()?,
        }
        match row.score {
            Some(v) => sink.append_double(v)?,
            None => sink.append_null()?,
        }
        match row.active {
            Some(v) => sink.append_boolean(v)?,
            None => sink.append_null()?,
        }
        sink.finish_record()?;
    }
    sink.close()
}

/// Reads every column of every batch and returns the number of non-null values seen.
pub fn scan_file(path: &Path, config: ReaderConfig) -> StorageResult<usize> {
    let mut reader = BatchReader::open(path, config, Arc::new(CodecRegistry::builtin()))?;
    let mut vectors: Vec<TypedVector> = (0..reader.column_count())
        .filter_map(|i| reader.storage_type(i))
        .map(TypedVector::new)
        .collect();

    let mut present = 0;
    while let Some(rows) = reader.next_batch()? {
        for (index, vector) in vectors.iter_mut().enumerate() {
            reader.read_vector(index, vector)?;
            present += (0..rows).filter(|&r| !vector.is_null(r)).count();
        }
    }
    Ok(present)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_rows_is_deterministic() {
        let a = generate_rows(100, 0.1);
        let b = generate_rows(100, 0.1);
        assert_eq!(a.len(), 100);
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_rows_without_nulls() {
        let rows = generate_rows(50, 0.0);
        assert!(rows.iter().all(|r| r.id.is_some() && r.name.is_some() && r.active.is_some()));
    }
}

//! Row-oriented sink over the file writer.
//!
//! A row is written as `begin_record`, exactly one append per declared
//! column in schema order, then `finish_record`. Values are staged until the
//! row is finished, so the encoders only ever see complete rows.
//!
//! Any error puts the sink into a failed state: every later call returns
//! [`StorageError::SinkFailed`] and the file is never finalized.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use strata_columnar::codec::CodecRegistry;
//! use strata_columnar::config::WriterConfig;
//! use strata_columnar::schema::ColumnSchema;
//! use strata_columnar::sink::RowSink;
//! use strata_common::types::{ColumnId, StorageType};
//!
//! # fn main() -> strata_columnar::error::StorageResult<()> {
//! let schema = ColumnSchema::new(
//!     vec![ColumnId::new(1), ColumnId::new(2)],
//!     vec![StorageType::Integral, StorageType::Text],
//! )?;
//! let mut sink = RowSink::create(
//!     schema,
//!     "/tmp/rows.strata",
//!     WriterConfig::default(),
//!     Arc::new(CodecRegistry::builtin()),
//! )?;
//!
//! sink.begin_record(1)?;
//! sink.append_long(42)?;
//! sink.append_null()?;
//! sink.finish_record()?;
//!
//! let summary = sink.close()?;
//! assert_eq!(summary.row_count, 1);
//! # Ok(())
//! # }
//! ```

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_common::types::StorageType;
use tracing::{debug, warn};

use crate::codec::CodecRegistry;
use crate::config::WriterConfig;
use crate::encoding::Value;
use crate::error::{StorageError, StorageResult};
use crate::schema::ColumnSchema;
use crate::writer::{FileSummary, FileWriter};

/// Lifecycle state of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Between records.
    Idle,
    /// Inside `begin_record` .. `finish_record`.
    InRecord,
    /// An earlier call failed; the sink is unusable.
    Failed,
}

/// One staged cell. Variable-length values point into the sink's scratch
/// buffers.
#[derive(Debug, Clone)]
enum Cell {
    Null,
    Integral(i64),
    FloatingPoint(f64),
    Boolean(bool),
    Text(Range<usize>),
    Opaque(Range<usize>),
}

impl Cell {
    fn as_value<'a>(&self, text: &'a str, bytes: &'a [u8]) -> Value<'a> {
        match self {
            Self::Null => Value::Null,
            Self::Integral(v) => Value::Integral(*v),
            Self::FloatingPoint(v) => Value::FloatingPoint(*v),
            Self::Boolean(v) => Value::Boolean(*v),
            Self::Text(range) => Value::Text(&text[range.clone()]),
            Self::Opaque(range) => Value::Opaque(&bytes[range.clone()]),
        }
    }
}

/// Writes rows into one columnar file.
pub struct RowSink {
    /// Target path.
    path: PathBuf,
    /// Schema the sink was created with.
    schema: ColumnSchema,
    /// Underlying writer; taken on close.
    writer: Option<FileWriter>,
    /// Lifecycle state.
    state: SinkState,
    /// Cells of the row in progress.
    cells: Vec<Cell>,
    /// Backing storage for staged text cells.
    text_scratch: String,
    /// Backing storage for staged opaque cells.
    byte_scratch: Vec<u8>,
    /// Sample weight of the row in progress.
    sample_weight: u64,
    /// Rows committed so far.
    committed_rows: u64,
}

impl RowSink {
    /// Creates the target file and returns a sink bound to `schema`.
    pub fn create(
        schema: ColumnSchema,
        path: impl AsRef<Path>,
        config: WriterConfig,
        codecs: Arc<CodecRegistry>,
    ) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = FileWriter::create(&path, schema.clone(), config, codecs)?;
        debug!(path = %path.display(), schema = %schema, "opened row sink");

        Ok(Self {
            cells: Vec::with_capacity(schema.len()),
            path,
            schema,
            writer: Some(writer),
            state: SinkState::Idle,
            text_scratch: String::new(),
            byte_scratch: Vec::new(),
            sample_weight: 0,
            committed_rows: 0,
        })
    }

    /// Target path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema the sink was created with.
    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Rows committed by `finish_record`.
    pub fn row_count(&self) -> u64 {
        self.committed_rows
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SinkState {
        self.state
    }

    /// Starts a row. `sample_weight` must be at least 1.
    pub fn begin_record(&mut self, sample_weight: u64) -> StorageResult<()> {
        self.ensure_usable()?;
        if self.state == SinkState::InRecord {
            return Err(self.fail(StorageError::schema_mismatch(
                "begin_record called while a record is open",
            )));
        }
        if sample_weight == 0 || sample_weight > i64::MAX as u64 {
            return Err(self.fail(StorageError::invalid_argument(format!(
                "sample weight must be between 1 and {}, got {}",
                i64::MAX,
                sample_weight
            ))));
        }
        self.sample_weight = sample_weight;
        self.state = SinkState::InRecord;
        Ok(())
    }

    /// Appends an integral value.
    pub fn append_long(&mut self, value: i64) -> StorageResult<()> {
        self.stage(Cell::Integral(value), Some(StorageType::Integral))
    }

    /// Appends a text value.
    pub fn append_string(&mut self, value: &str) -> StorageResult<()> {
        let start = self.text_scratch.len();
        let range = start..start + value.len();
        self.stage(Cell::Text(range), Some(StorageType::Text))?;
        self.text_scratch.push_str(value);
        Ok(())
    }

    /// Appends an opaque value.
    pub fn append_bytes(&mut self, value: &[u8]) -> StorageResult<()> {
        let start = self.byte_scratch.len();
        let range = start..start + value.len();
        self.stage(Cell::Opaque(range), Some(StorageType::Opaque))?;
        self.byte_scratch.extend_from_slice(value);
        Ok(())
    }

    /// Appends a floating-point value. Every bit pattern is preserved.
    pub fn append_double(&mut self, value: f64) -> StorageResult<()> {
        self.stage(Cell::FloatingPoint(value), Some(StorageType::FloatingPoint))
    }

    /// Appends a boolean value.
    pub fn append_boolean(&mut self, value: bool) -> StorageResult<()> {
        self.stage(Cell::Boolean(value), Some(StorageType::Boolean))
    }

    /// Marks the current column as null. Legal for every storage type.
    pub fn append_null(&mut self) -> StorageResult<()> {
        self.stage(Cell::Null, None)
    }

    /// Commits the staged row.
    ///
    /// Fails unless every declared column received exactly one append.
    pub fn finish_record(&mut self) -> StorageResult<()> {
        self.ensure_usable()?;
        if self.state != SinkState::InRecord {
            return Err(self.fail(StorageError::schema_mismatch(
                "finish_record called without begin_record",
            )));
        }
        if self.cells.len() != self.schema.len() {
            let reason = format!(
                "record has {} of {} columns",
                self.cells.len(),
                self.schema.len()
            );
            return Err(self.fail(StorageError::schema_mismatch(reason)));
        }

        let weight = self
            .schema
            .sample_weight_column()
            .map(|_| Value::Integral(self.sample_weight as i64));
        let result = match self.writer.as_mut() {
            Some(writer) => writer.commit_row(
                self.cells
                    .iter()
                    .map(|c| c.as_value(&self.text_scratch, &self.byte_scratch))
                    .chain(weight),
            ),
            None => Err(StorageError::SinkFailed),
        };
        if let Err(e) = result {
            return Err(self.fail(e));
        }

        self.cells.clear();
        self.text_scratch.clear();
        self.byte_scratch.clear();
        self.committed_rows += 1;
        self.state = SinkState::Idle;
        Ok(())
    }

    /// Finalizes the file.
    ///
    /// Fails if a record is still open or the sink already failed; in both
    /// cases the file is left unfinalized.
    pub fn close(mut self) -> StorageResult<FileSummary> {
        let writer = self.writer.take();
        match (self.state, writer) {
            (SinkState::Idle, Some(writer)) => writer.close(),
            (SinkState::InRecord, _) => {
                warn!(path = %self.path.display(), "row sink closed with an open record, file left unfinalized");
                Err(StorageError::schema_mismatch(format!(
                    "close called with an open record ({} of {} columns appended)",
                    self.cells.len(),
                    self.schema.len()
                )))
            }
            _ => {
                warn!(path = %self.path.display(), "failed row sink closed, file left unfinalized");
                Err(StorageError::SinkFailed)
            }
        }
    }

    fn stage(&mut self, cell: Cell, ty: Option<StorageType>) -> StorageResult<()> {
        self.ensure_usable()?;
        if self.state != SinkState::InRecord {
            return Err(self.fail(StorageError::schema_mismatch(
                "append called outside a record",
            )));
        }
        let index = self.cells.len();
        let expected = match self.schema.column(index) {
            Some(column) => column.storage_type,
            None => {
                let reason = format!("append past the last of {} columns", self.schema.len());
                return Err(self.fail(StorageError::schema_mismatch(reason)));
            }
        };
        if let Some(ty) = ty {
            if ty != expected {
                let reason = format!("column {} expects {}, got {}", index, expected, ty);
                return Err(self.fail(StorageError::schema_mismatch(reason)));
            }
        }
        self.cells.push(cell);
        Ok(())
    }

    fn ensure_usable(&self) -> StorageResult<()> {
        if self.state == SinkState::Failed {
            Err(StorageError::SinkFailed)
        } else {
            Ok(())
        }
    }

    fn fail(&mut self, err: StorageError) -> StorageError {
        self.state = SinkState::Failed;
        err
    }
}

impl Drop for RowSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            warn!(
                path = %self.path.display(),
                rows = writer.row_count(),
                "row sink dropped without close, file left unfinalized"
            );
        }
    }
}

impl std::fmt::Debug for RowSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowSink")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("rows", &self.committed_rows)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::types::ColumnId;
    use tempfile::TempDir;

    fn schema() -> ColumnSchema {
        ColumnSchema::new(
            vec![ColumnId::new(1), ColumnId::new(2), ColumnId::new(3)],
            vec![StorageType::Integral, StorageType::Text, StorageType::Boolean],
        )
        .unwrap()
    }

    fn create(dir: &TempDir, name: &str) -> RowSink {
        RowSink::create(
            schema(),
            dir.path().join(name),
            WriterConfig::default().with_sync_on_close(false),
            Arc::new(CodecRegistry::builtin()),
        )
        .unwrap()
    }

    #[test]
    fn test_write_rows() {
        let dir = TempDir::new().unwrap();
        let mut sink = create(&dir, "rows.strata");

        for i in 0..3 {
            sink.begin_record(1).unwrap();
            sink.append_long(i).unwrap();
            sink.append_string("value").unwrap();
            sink.append_null().unwrap();
            sink.finish_record().unwrap();
        }
        assert_eq!(sink.row_count(), 3);
        assert_eq!(sink.state(), SinkState::Idle);

        let summary = sink.close().unwrap();
        assert_eq!(summary.row_count, 3);
        assert_eq!(summary.path, dir.path().join("rows.strata"));
    }

    #[test]
    fn test_wrong_type_fails_sink() {
        let dir = TempDir::new().unwrap();
        let mut sink = create(&dir, "wrong.strata");

        sink.begin_record(1).unwrap();
        let err = sink.append_string("not a long").unwrap_err();
        assert!(err.is_schema_mismatch());
        assert_eq!(sink.state(), SinkState::Failed);

        assert!(matches!(sink.append_long(1), Err(StorageError::SinkFailed)));
        assert!(matches!(sink.begin_record(1), Err(StorageError::SinkFailed)));
        assert!(matches!(sink.close(), Err(StorageError::SinkFailed)));
    }

    #[test]
    fn test_too_few_appends() {
        let dir = TempDir::new().unwrap();
        let mut sink = create(&dir, "few.strata");
        sink.begin_record(1).unwrap();
        sink.append_long(1).unwrap();
        let err = sink.finish_record().unwrap_err();
        assert!(err.is_schema_mismatch());
        assert!(err.to_string().contains("1 of 3"));
    }

    #[test]
    fn test_too_many_appends() {
        let dir = TempDir::new().unwrap();
        let mut sink = create(&dir, "many.strata");
        sink.begin_record(1).unwrap();
        sink.append_long(1).unwrap();
        sink.append_string("a").unwrap();
        sink.append_boolean(true).unwrap();
        let err = sink.append_null().unwrap_err();
        assert!(err.to_string().contains("past the last"));
    }

    #[test]
    fn test_append_outside_record() {
        let dir = TempDir::new().unwrap();
        let mut sink = create(&dir, "outside.strata");
        assert!(sink.append_long(1).unwrap_err().is_schema_mismatch());
    }

    #[test]
    fn test_finish_without_begin() {
        let dir = TempDir::new().unwrap();
        let mut sink = create(&dir, "nobegin.strata");
        assert!(sink.finish_record().unwrap_err().is_schema_mismatch());
    }

    #[test]
    fn test_nested_begin() {
        let dir = TempDir::new().unwrap();
        let mut sink = create(&dir, "nested.strata");
        sink.begin_record(1).unwrap();
        assert!(sink.begin_record(1).unwrap_err().is_schema_mismatch());
    }

    #[test]
    fn test_zero_weight() {
        let dir = TempDir::new().unwrap();
        let mut sink = create(&dir, "weight.strata");
        let err = sink.begin_record(0).unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument { .. }));
        assert_eq!(sink.state(), SinkState::Failed);
    }

    #[test]
    fn test_close_with_open_record() {
        let dir = TempDir::new().unwrap();
        let mut sink = create(&dir, "open.strata");
        sink.begin_record(1).unwrap();
        sink.append_long(1).unwrap();
        let err = sink.close().unwrap_err();
        assert!(err.is_schema_mismatch());
    }

    #[test]
    fn test_scratch_is_reused_between_rows() {
        let dir = TempDir::new().unwrap();
        let mut sink = create(&dir, "scratch.strata");
        for text in ["first", "second row", ""] {
            sink.begin_record(2).unwrap();
            sink.append_null().unwrap();
            sink.append_string(text).unwrap();
            sink.append_boolean(false).unwrap();
            sink.finish_record().unwrap();
            assert!(sink.text_scratch.is_empty());
            assert!(sink.cells.is_empty());
        }
        assert_eq!(sink.close().unwrap().row_count, 3);
    }
}

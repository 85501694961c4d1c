//! Stripe-oriented file writer.
//!
//! The writer owns one encoder per stored column. Rows are buffered in the
//! encoders until `stripe_max_rows` is reached, then every column is encoded,
//! compressed and written as one contiguous stream. `close` writes the footer
//! and the tail and optionally syncs the file.
//!
//! The file is written in place at its final path. Until `close` succeeds the
//! file has no tail, so readers reject it.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_common::constants::DEFAULT_WRITE_BUFFER_SIZE;
use tracing::{debug, info};

use crate::checksum::compute_checksum;
use crate::codec::{compress_stream, CodecRegistry, CompressionKind};
use crate::config::WriterConfig;
use crate::encoding::{ColumnEncoder, Value};
use crate::error::{StorageError, StorageResult};
use crate::format::{FileHeader, FileTail, Footer, StreamInfo, StripeInfo};
use crate::schema::ColumnSchema;

/// Outcome of a successful close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    /// Path of the finalized file.
    pub path: PathBuf,
    /// Rows written.
    pub row_count: u64,
    /// Stripes written.
    pub stripe_count: usize,
    /// Final file size in bytes.
    pub file_size: u64,
}

/// Writes one columnar file.
pub struct FileWriter {
    /// Target path.
    path: PathBuf,
    /// Buffered file handle.
    file: BufWriter<File>,
    /// Writer settings.
    config: WriterConfig,
    /// Codecs available for stream compression.
    codecs: Arc<CodecRegistry>,
    /// One encoder per stored column.
    encoders: Vec<ColumnEncoder>,
    /// Footer under construction.
    footer: Footer,
    /// Next byte offset in the file.
    write_pos: u64,
    /// Rows buffered in the encoders.
    buffered_rows: usize,
    /// Set once a stripe or row could not be written completely.
    failed: bool,
}

impl FileWriter {
    /// Creates the file at `path` and writes its header.
    ///
    /// An existing file at `path` is truncated. Both the configured
    /// compression and [`CompressionKind::None`] must be present in `codecs`.
    pub fn create(
        path: impl AsRef<Path>,
        schema: ColumnSchema,
        config: WriterConfig,
        codecs: Arc<CodecRegistry>,
    ) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        config.validate()?;
        codecs.resolve(config.compression)?;
        // Small or incompressible streams fall back to uncompressed storage.
        codecs.resolve(CompressionKind::None)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StorageError::write_failure(&path, e))?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| StorageError::write_failure(&path, e))?;

        let encoders = schema
            .physical_columns()
            .iter()
            .map(|c| ColumnEncoder::new(c.storage_type, config.initial_buffer_capacity))
            .collect();

        let mut writer = Self {
            path,
            file: BufWriter::with_capacity(DEFAULT_WRITE_BUFFER_SIZE, file),
            config,
            codecs,
            encoders,
            footer: Footer::new(schema),
            write_pos: 0,
            buffered_rows: 0,
            failed: false,
        };
        writer.write_bytes(&FileHeader::new().to_bytes())?;
        Ok(writer)
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema of the file being written.
    pub fn schema(&self) -> &ColumnSchema {
        &self.footer.schema
    }

    /// Rows accepted so far, flushed or buffered.
    pub fn row_count(&self) -> u64 {
        self.footer.row_count + self.buffered_rows as u64
    }

    /// Stripes flushed so far.
    pub fn stripe_count(&self) -> usize {
        self.footer.stripes.len()
    }

    /// Rows buffered in the current stripe.
    pub fn buffered_rows(&self) -> usize {
        self.buffered_rows
    }

    /// Appends one row holding a value for every stored column.
    ///
    /// The row is checked against the schema before any encoder sees it, so
    /// a rejected row leaves the writer unchanged.
    pub fn append_row(&mut self, row: &[Value<'_>]) -> StorageResult<()> {
        self.ensure_usable()?;
        if row.len() != self.encoders.len() {
            return Err(StorageError::schema_mismatch(format!(
                "row has {} values, file stores {} columns",
                row.len(),
                self.encoders.len()
            )));
        }
        for (index, (encoder, value)) in self.encoders.iter().zip(row).enumerate() {
            if let Some(ty) = value.storage_type() {
                if ty != encoder.storage_type() {
                    return Err(StorageError::schema_mismatch(format!(
                        "column {} expects {}, got {}",
                        index,
                        encoder.storage_type(),
                        ty
                    )));
                }
            }
        }
        self.commit_row(row.iter().copied())
    }

    /// Appends a row already checked against the schema.
    pub(crate) fn commit_row<'v>(
        &mut self,
        row: impl IntoIterator<Item = Value<'v>>,
    ) -> StorageResult<()> {
        self.ensure_usable()?;
        for (encoder, value) in self.encoders.iter_mut().zip(row) {
            if let Err(e) = encoder.append(value) {
                self.failed = true;
                return Err(e);
            }
        }
        self.buffered_rows += 1;
        if self.buffered_rows >= self.config.stripe_max_rows {
            self.flush_stripe()?;
        }
        Ok(())
    }

    /// Writes the buffered rows as a stripe. Does nothing when empty.
    ///
    /// A failure leaves the encoders and the file in an unknown state, so
    /// every later call on the writer returns [`StorageError::WriterFailed`].
    pub fn flush_stripe(&mut self) -> StorageResult<()> {
        self.ensure_usable()?;
        if self.buffered_rows == 0 {
            return Ok(());
        }
        let result = self.write_stripe();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn write_stripe(&mut self) -> StorageResult<()> {
        let codecs = Arc::clone(&self.codecs);
        let codec = codecs.resolve(self.config.compression)?;

        let mut encoded = Vec::with_capacity(self.encoders.len());
        for encoder in &mut self.encoders {
            debug_assert_eq!(encoder.len(), self.buffered_rows);
            let raw = encoder.finish();
            let raw_len = raw.len() as u64;
            let (kind, stored) = compress_stream(codec, raw)?;
            encoded.push((kind, raw_len, stored));
        }

        let mut streams = Vec::with_capacity(encoded.len());
        for (codec, raw_len, stored) in encoded {
            let offset = self.write_pos;
            self.write_bytes(&stored)?;
            streams.push(StreamInfo {
                codec,
                offset,
                stored_len: stored.len() as u64,
                raw_len,
                checksum: compute_checksum(&stored),
            });
        }

        let stripe = StripeInfo {
            row_count: self.buffered_rows as u32,
            streams,
        };
        debug!(
            path = %self.path.display(),
            stripe = self.footer.stripes.len(),
            rows = stripe.row_count,
            stored_bytes = stripe.stored_len(),
            raw_bytes = stripe.raw_len(),
            "flushed stripe"
        );
        self.footer.push_stripe(stripe);
        self.buffered_rows = 0;
        Ok(())
    }

    /// Flushes the last stripe, writes footer and tail, and syncs the file
    /// when configured to.
    ///
    /// A writer that already failed returns [`StorageError::WriterFailed`]
    /// and leaves the file without a tail.
    pub fn close(mut self) -> StorageResult<FileSummary> {
        self.flush_stripe()?;

        let footer = self.footer.serialize();
        let tail = FileTail::new(footer.len() as u64, compute_checksum(&footer));
        self.write_bytes(&footer)?;
        self.write_bytes(&tail.to_bytes())?;

        self.file
            .flush()
            .map_err(|e| StorageError::write_failure(&self.path, e))?;
        if self.config.sync_on_close {
            self.file
                .get_ref()
                .sync_all()
                .map_err(|e| StorageError::write_failure(&self.path, e))?;
        }

        let summary = FileSummary {
            path: self.path.clone(),
            row_count: self.footer.row_count,
            stripe_count: self.footer.stripes.len(),
            file_size: self.write_pos,
        };
        info!(
            path = %summary.path.display(),
            rows = summary.row_count,
            stripes = summary.stripe_count,
            bytes = summary.file_size,
            compression = %self.config.compression,
            "closed columnar file"
        );
        Ok(summary)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> StorageResult<()> {
        if let Err(e) = self.file.write_all(bytes) {
            self.failed = true;
            return Err(StorageError::write_failure(&self.path, e));
        }
        self.write_pos += bytes.len() as u64;
        Ok(())
    }

    fn ensure_usable(&self) -> StorageResult<()> {
        if self.failed {
            Err(StorageError::WriterFailed)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("path", &self.path)
            .field("rows", &self.row_count())
            .field("stripes", &self.stripe_count())
            .field("write_pos", &self.write_pos)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::constants::{FILE_HEADER_SIZE, FILE_TAIL_SIZE};
    use strata_common::types::{ColumnId, StorageType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    use crate::codec::{Codec, Lz4Codec, PassthroughCodec};
    use crate::reader::BatchReader;
    use crate::ReaderConfig;

    /// Lz4 codec whose compress fails from the second call on.
    #[derive(Debug, Default)]
    struct FailingCodec {
        calls: AtomicUsize,
    }

    impl Codec for FailingCodec {
        fn kind(&self) -> CompressionKind {
            CompressionKind::Lz4
        }

        fn compress(&self, input: &[u8]) -> StorageResult<Vec<u8>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Lz4Codec.compress(input)
            } else {
                Err(StorageError::compression(CompressionKind::Lz4, "device full"))
            }
        }

        fn decompress(&self, input: &[u8], raw_len: usize) -> StorageResult<Vec<u8>> {
            Lz4Codec.decompress(input, raw_len)
        }
    }

    fn schema() -> ColumnSchema {
        ColumnSchema::new(
            vec![ColumnId::new(1), ColumnId::new(2)],
            vec![StorageType::Integral, StorageType::Text],
        )
        .unwrap()
    }

    fn codecs() -> Arc<CodecRegistry> {
        Arc::new(CodecRegistry::builtin())
    }

    #[test]
    fn test_empty_file_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.strata");

        let writer = FileWriter::create(&path, schema(), WriterConfig::default(), codecs()).unwrap();
        let summary = writer.close().unwrap();

        assert_eq!(summary.row_count, 0);
        assert_eq!(summary.stripe_count, 0);
        let len = fs::metadata(&path).unwrap().len();
        assert_eq!(len, summary.file_size);
        assert!(len > (FILE_HEADER_SIZE + FILE_TAIL_SIZE) as u64);
    }

    #[test]
    fn test_stripes_flush_at_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stripes.strata");
        let config = WriterConfig::new()
            .with_stripe_max_rows(4)
            .with_sync_on_close(false);

        let mut writer = FileWriter::create(&path, schema(), config, codecs()).unwrap();
        for i in 0..10 {
            writer
                .append_row(&[Value::Integral(i), Value::Text("row")])
                .unwrap();
        }
        assert_eq!(writer.stripe_count(), 2);
        assert_eq!(writer.buffered_rows(), 2);
        assert_eq!(writer.row_count(), 10);

        let summary = writer.close().unwrap();
        assert_eq!(summary.stripe_count, 3);
        assert_eq!(summary.row_count, 10);
    }

    #[test]
    fn test_rejected_row_leaves_writer_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reject.strata");
        let mut writer =
            FileWriter::create(&path, schema(), WriterConfig::default(), codecs()).unwrap();

        let err = writer
            .append_row(&[Value::Integral(1), Value::Boolean(true)])
            .unwrap_err();
        assert!(err.is_schema_mismatch());
        let err = writer.append_row(&[Value::Integral(1)]).unwrap_err();
        assert!(err.is_schema_mismatch());

        writer.append_row(&[Value::Null, Value::Null]).unwrap();
        assert_eq!(writer.row_count(), 1);
        assert_eq!(writer.close().unwrap().row_count, 1);
    }

    #[test]
    fn test_missing_codec_fails_at_create() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nocodec.strata");
        let config = WriterConfig::new().with_compression(CompressionKind::Zstd);
        let err = FileWriter::create(&path, schema(), config, Arc::new(CodecRegistry::empty()))
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::CodecUnavailable {
                kind: CompressionKind::Zstd
            }
        ));
    }

    #[test]
    fn test_unwritable_path_is_write_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = FileWriter::create(
            blocker.join("file.strata"),
            schema(),
            WriterConfig::default(),
            codecs(),
        )
        .unwrap_err();
        assert!(err.is_write_failure());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("nested.strata");
        let writer = FileWriter::create(&path, schema(), WriterConfig::default(), codecs()).unwrap();
        writer.close().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unclosed_writer_has_no_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unclosed.strata");
        {
            let mut writer =
                FileWriter::create(&path, schema(), WriterConfig::default(), codecs()).unwrap();
            writer.append_row(&[Value::Integral(5), Value::Text("x")]).unwrap();
            writer.flush_stripe().unwrap();
        }
        let bytes = fs::read(&path).unwrap();
        assert!(!bytes.ends_with(&strata_common::constants::TAIL_MAGIC));
    }

    #[test]
    fn test_failed_stripe_poisons_writer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed.strata");
        let codecs = Arc::new(
            CodecRegistry::empty()
                .with_codec(Arc::new(PassthroughCodec))
                .with_codec(Arc::new(FailingCodec::default())),
        );
        let config = WriterConfig::new()
            .with_compression(CompressionKind::Lz4)
            .with_sync_on_close(false);

        let mut writer = FileWriter::create(&path, schema(), config, codecs).unwrap();
        let text = "the quick brown fox ".repeat(4);
        for i in 0..32 {
            writer
                .append_row(&[Value::Integral(i), Value::Text(&text)])
                .unwrap();
        }

        let err = writer.flush_stripe().unwrap_err();
        assert!(matches!(err, StorageError::Compression { .. }), "unexpected error {:?}", err);
        assert!(matches!(writer.flush_stripe(), Err(StorageError::WriterFailed)));
        assert!(matches!(
            writer.append_row(&[Value::Integral(99), Value::Null]),
            Err(StorageError::WriterFailed)
        ));
        assert!(matches!(writer.close(), Err(StorageError::WriterFailed)));

        let bytes = fs::read(&path).unwrap();
        assert!(!bytes.ends_with(&strata_common::constants::TAIL_MAGIC));
        let err = BatchReader::open(&path, ReaderConfig::default(), Arc::new(CodecRegistry::builtin()))
            .unwrap_err();
        assert!(err.is_corruption(), "unexpected error {:?}", err);
    }

    #[test]
    fn test_registry_without_passthrough_fails_at_create() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lz4-only.strata");
        let config = WriterConfig::new().with_compression(CompressionKind::Lz4);
        let lz4_only = Arc::new(CodecRegistry::empty().with_codec(Arc::new(Lz4Codec)));

        let err = FileWriter::create(&path, schema(), config, lz4_only).unwrap_err();
        assert!(matches!(
            err,
            StorageError::CodecUnavailable {
                kind: CompressionKind::None
            }
        ));
        assert!(!path.exists());
    }
}

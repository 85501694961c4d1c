//! Forward-only batch reader.
//!
//! A reader validates header, tail and footer when it is opened, then hands
//! out batches with `next_batch`. A batch never spans two stripes. Column
//! streams are loaded lazily by `read_vector`: only the requested column of
//! the current stripe is read, verified, decompressed and decoded, and the
//! result is cached until the reader moves to the next stripe.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use strata_common::constants::{FILE_HEADER_SIZE, FILE_TAIL_SIZE};
use strata_common::types::{ColumnId, StorageType};
use tracing::debug;

use crate::checksum::ChecksumResult;
use crate::codec::CodecRegistry;
use crate::config::ReaderConfig;
use crate::encoding::DecodedColumn;
use crate::error::{StorageError, StorageResult};
use crate::format::{FileHeader, FileTail, Footer, StripeInfo};
use crate::schema::{ColumnDescriptor, ColumnSchema};
use crate::vector::TypedVector;

/// Rows handed out by the last `next_batch` call.
#[derive(Debug, Clone)]
struct ActiveBatch {
    stripe: usize,
    rows: Range<usize>,
}

/// Sequential reader over one columnar file.
pub struct BatchReader {
    /// File being read.
    path: PathBuf,
    /// Private handle; readers never share file state.
    file: File,
    /// Reader settings.
    config: ReaderConfig,
    /// Codecs available for stream decompression.
    codecs: Arc<CodecRegistry>,
    /// Validated footer.
    footer: Footer,
    /// Stored columns, in stream order.
    columns: Vec<ColumnDescriptor>,
    /// Rows consumed so far.
    position: u64,
    /// Stripe the next batch is taken from.
    stripe_index: usize,
    /// Rows of that stripe already handed out.
    stripe_offset: usize,
    /// Current batch, if any.
    batch: Option<ActiveBatch>,
    /// Decoded columns of the current stripe.
    cache: Vec<Option<DecodedColumn>>,
}

impl BatchReader {
    /// Opens and validates a finalized file.
    pub fn open(
        path: impl AsRef<Path>,
        config: ReaderConfig,
        codecs: Arc<CodecRegistry>,
    ) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        config.validate()?;

        let mut file = File::open(&path)?;
        let file_len = file.metadata()?.len();
        let min_len = (FILE_HEADER_SIZE + FILE_TAIL_SIZE) as u64;
        if file_len < min_len {
            return Err(StorageError::corrupt(
                &path,
                format!(
                    "file holds {} bytes, a finalized file needs at least {}",
                    file_len, min_len
                ),
            ));
        }

        let mut header = [0u8; FILE_HEADER_SIZE];
        file.read_exact(&mut header)?;
        FileHeader::from_bytes(&header, &path)?;

        let mut tail = [0u8; FILE_TAIL_SIZE];
        file.seek(SeekFrom::Start(file_len - FILE_TAIL_SIZE as u64))?;
        file.read_exact(&mut tail)?;
        let tail = FileTail::from_bytes(&tail, &path)?;

        let footer_start = (file_len - min_len)
            .checked_sub(tail.footer_len)
            .map(|data_len| FILE_HEADER_SIZE as u64 + data_len)
            .ok_or_else(|| {
                StorageError::corrupt(
                    &path,
                    format!(
                        "footer of {} bytes does not fit in a {} byte file",
                        tail.footer_len, file_len
                    ),
                )
            })?;

        let mut footer_bytes = vec![0u8; tail.footer_len as usize];
        file.seek(SeekFrom::Start(footer_start))?;
        file.read_exact(&mut footer_bytes)?;
        if let ChecksumResult::Invalid { expected, computed } =
            ChecksumResult::check(&footer_bytes, tail.footer_checksum)
        {
            return Err(StorageError::checksum_mismatch(
                format!("footer of {}", path.display()),
                expected,
                computed,
            ));
        }
        let footer = Footer::deserialize(&footer_bytes, footer_start, &path)?;

        debug!(
            path = %path.display(),
            rows = footer.row_count,
            stripes = footer.stripes.len(),
            schema = %footer.schema,
            "opened columnar file"
        );

        let columns = footer.schema.physical_columns();
        Ok(Self {
            cache: vec![None; columns.len()],
            columns,
            path,
            file,
            config,
            codecs,
            footer,
            position: 0,
            stripe_index: 0,
            stripe_offset: 0,
            batch: None,
        })
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema recorded in the file.
    pub fn schema(&self) -> &ColumnSchema {
        &self.footer.schema
    }

    /// Total rows in the file.
    pub fn total_row_count(&self) -> u64 {
        self.footer.row_count
    }

    /// Rows handed out so far, including the current batch.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of stored columns, including the sample-weight column.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Storage type of stored column `index`.
    pub fn storage_type(&self, index: usize) -> Option<StorageType> {
        self.columns.get(index).map(|c| c.storage_type)
    }

    /// Id of stored column `index`.
    pub fn column_id(&self, index: usize) -> Option<ColumnId> {
        self.columns.get(index).map(|c| c.id)
    }

    /// Index of the sample-weight column, if the file has one.
    pub fn sample_weight_column_index(&self) -> Option<usize> {
        self.footer
            .schema
            .sample_weight_column()
            .map(|_| self.footer.schema.len())
    }

    /// Stripe directory.
    pub fn stripes(&self) -> &[StripeInfo] {
        &self.footer.stripes
    }

    /// Length of the current batch, if one is active.
    pub fn current_batch_len(&self) -> Option<usize> {
        self.batch.as_ref().map(|b| b.rows.len())
    }

    /// Advances to the next batch.
    ///
    /// Returns the number of rows in the batch, or `None` once every row has
    /// been consumed. `None` is returned again on every later call.
    pub fn next_batch(&mut self) -> StorageResult<Option<usize>> {
        loop {
            let Some(stripe) = self.footer.stripes.get(self.stripe_index) else {
                self.batch = None;
                return Ok(None);
            };
            let stripe_rows = stripe.row_count as usize;
            if self.stripe_offset < stripe_rows {
                let len = self
                    .config
                    .batch_size
                    .min(stripe_rows - self.stripe_offset);
                let rows = self.stripe_offset..self.stripe_offset + len;
                self.stripe_offset += len;
                self.position += len as u64;
                self.batch = Some(ActiveBatch {
                    stripe: self.stripe_index,
                    rows,
                });
                return Ok(Some(len));
            }
            self.stripe_index += 1;
            self.stripe_offset = 0;
            self.cache.iter_mut().for_each(|slot| *slot = None);
        }
    }

    /// Fills `vector` with column `column_index` of the current batch.
    ///
    /// The vector must be shaped for the column's storage type. It is
    /// emptied first, so on error it holds no rows from an earlier batch.
    pub fn read_vector(&mut self, column_index: usize, vector: &mut TypedVector) -> StorageResult<()> {
        vector.clear();
        let batch = self.batch.clone().ok_or(StorageError::NoActiveBatch)?;
        let column = *self.columns.get(column_index).ok_or_else(|| {
            StorageError::invalid_argument(format!(
                "column index {} out of range, file stores {} columns",
                column_index,
                self.columns.len()
            ))
        })?;
        if vector.storage_type() != column.storage_type {
            return Err(StorageError::schema_mismatch(format!(
                "column {} ({}) is {}, vector is {}",
                column_index,
                column.id,
                column.storage_type,
                vector.storage_type()
            )));
        }

        if self.cache[column_index].is_none() {
            let decoded = self.load_column(batch.stripe, column_index)?;
            self.cache[column_index] = Some(decoded);
        }
        match &self.cache[column_index] {
            Some(decoded) => vector.load(decoded, batch.rows),
            None => Err(StorageError::NoActiveBatch),
        }
    }

    fn load_column(&mut self, stripe_index: usize, column_index: usize) -> StorageResult<DecodedColumn> {
        let stripe = &self.footer.stripes[stripe_index];
        let stream = stripe.streams[column_index];
        let rows = stripe.row_count as usize;
        let storage_type = self.columns[column_index].storage_type;

        let mut stored = vec![0u8; stream.stored_len as usize];
        self.file.seek(SeekFrom::Start(stream.offset))?;
        self.file.read_exact(&mut stored)?;

        if self.config.verify_checksums {
            if let ChecksumResult::Invalid { expected, computed } =
                ChecksumResult::check(&stored, stream.checksum)
            {
                return Err(StorageError::checksum_mismatch(
                    format!(
                        "stripe {} column {} of {}",
                        stripe_index,
                        column_index,
                        self.path.display()
                    ),
                    expected,
                    computed,
                ));
            }
        }

        let codec = self.codecs.resolve(stream.codec)?;
        let raw = codec.decompress(&stored, stream.raw_len as usize)?;
        DecodedColumn::decode(storage_type, Bytes::from(raw), rows).map_err(|e| {
            StorageError::corrupt(
                &self.path,
                format!("stripe {} column {}: {}", stripe_index, column_index, e),
            )
        })
    }
}

impl std::fmt::Debug for BatchReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchReader")
            .field("path", &self.path)
            .field("rows", &self.footer.row_count)
            .field("position", &self.position)
            .field("stripe", &self.stripe_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, OpenOptions};
    use std::io::Write;

    use tempfile::TempDir;

    use crate::codec::CompressionKind;
    use crate::config::WriterConfig;
    use crate::encoding::Value;
    use crate::writer::FileWriter;

    fn schema() -> ColumnSchema {
        ColumnSchema::new(
            vec![ColumnId::new(10), ColumnId::new(20)],
            vec![StorageType::Integral, StorageType::Text],
        )
        .unwrap()
    }

    fn codecs() -> Arc<CodecRegistry> {
        Arc::new(CodecRegistry::builtin())
    }

    fn write_file(path: &Path, rows: i64, stripe_max_rows: usize) {
        let config = WriterConfig::new()
            .with_stripe_max_rows(stripe_max_rows)
            .with_sync_on_close(false);
        let mut writer = FileWriter::create(path, schema(), config, codecs()).unwrap();
        for i in 0..rows {
            let text = format!("row-{}", i);
            let value = if i % 5 == 0 { Value::Null } else { Value::Text(&text) };
            writer.append_row(&[Value::Integral(i), value]).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn test_batches_respect_stripes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batches.strata");
        write_file(&path, 25, 10);

        let config = ReaderConfig::new().with_batch_size(4);
        let mut reader = BatchReader::open(&path, config, codecs()).unwrap();
        assert_eq!(reader.total_row_count(), 25);
        assert_eq!(reader.stripes().len(), 3);

        assert_eq!(reader.position(), 0);
        let mut sizes = Vec::new();
        let mut consumed = 0u64;
        while let Some(n) = reader.next_batch().unwrap() {
            consumed += n as u64;
            assert_eq!(reader.position(), consumed);
            sizes.push(n);
        }
        assert_eq!(sizes, vec![4, 4, 2, 4, 4, 2, 4, 1]);
        assert_eq!(reader.position(), 25);
        assert_eq!(reader.next_batch().unwrap(), None);
    }

    #[test]
    fn test_read_values_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("order.strata");
        write_file(&path, 30, 7);

        let mut reader =
            BatchReader::open(&path, ReaderConfig::new().with_batch_size(5), codecs()).unwrap();
        let mut longs = TypedVector::new(StorageType::Integral);
        let mut texts = TypedVector::new(StorageType::Text);
        let mut expected = 0i64;

        while let Some(n) = reader.next_batch().unwrap() {
            reader.read_vector(0, &mut longs).unwrap();
            reader.read_vector(1, &mut texts).unwrap();
            let l = longs.as_long().unwrap();
            let t = texts.as_slices().unwrap();
            assert_eq!(l.len(), n);
            assert_eq!(t.len(), n);
            for i in 0..n {
                assert_eq!(l.get(i), Some(expected));
                if expected % 5 == 0 {
                    assert!(t.is_null(i));
                } else {
                    assert_eq!(t.get_str(i), Some(format!("row-{}", expected).as_str()));
                }
                expected += 1;
            }
        }
        assert_eq!(expected, 30);
    }

    #[test]
    fn test_read_vector_requires_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nobatch.strata");
        write_file(&path, 3, 10);

        let mut reader = BatchReader::open(&path, ReaderConfig::default(), codecs()).unwrap();
        let mut vector = TypedVector::new(StorageType::Integral);
        assert!(matches!(
            reader.read_vector(0, &mut vector),
            Err(StorageError::NoActiveBatch)
        ));

        assert_eq!(reader.next_batch().unwrap(), Some(3));
        reader.read_vector(0, &mut vector).unwrap();
        assert_eq!(reader.next_batch().unwrap(), None);
        assert!(matches!(
            reader.read_vector(0, &mut vector),
            Err(StorageError::NoActiveBatch)
        ));
    }

    #[test]
    fn test_vector_shape_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shape.strata");
        write_file(&path, 3, 10);

        let mut reader = BatchReader::open(&path, ReaderConfig::default(), codecs()).unwrap();
        reader.next_batch().unwrap();
        let mut vector = TypedVector::new(StorageType::Boolean);
        assert!(reader.read_vector(0, &mut vector).unwrap_err().is_schema_mismatch());
        assert!(matches!(
            reader.read_vector(9, &mut vector),
            Err(StorageError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("truncated.strata");
        write_file(&path, 50, 10);

        let len = fs::metadata(&path).unwrap().len();
        for cut in [len - 1, len - 10, len / 2, 20, 3] {
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(cut).unwrap();
            drop(file);
            let err = BatchReader::open(&path, ReaderConfig::default(), codecs()).unwrap_err();
            assert!(err.is_corruption(), "cut at {}: {}", cut, err);
        }
    }

    #[test]
    fn test_footer_checksum_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("footer.strata");
        write_file(&path, 5, 10);

        let mut bytes = fs::read(&path).unwrap();
        let idx = bytes.len() - FILE_TAIL_SIZE - 2;
        bytes[idx] ^= 0x55;
        fs::write(&path, &bytes).unwrap();

        let err = BatchReader::open(&path, ReaderConfig::default(), codecs()).unwrap_err();
        assert!(matches!(err, StorageError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_not_a_columnar_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.strata");
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0xab; 128]).unwrap();
        drop(file);

        let err = BatchReader::open(&path, ReaderConfig::default(), codecs()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidMagic { .. }));
    }

    #[test]
    fn test_stream_corruption_reported_at_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stream.strata");
        write_file(&path, 20, 100);

        let offset = {
            let reader = BatchReader::open(&path, ReaderConfig::default(), codecs()).unwrap();
            reader.stripes()[0].streams[1].offset as usize
        };
        let mut bytes = fs::read(&path).unwrap();
        bytes[offset + 3] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        let mut reader = BatchReader::open(&path, ReaderConfig::default(), codecs()).unwrap();
        reader.next_batch().unwrap();
        let mut longs = TypedVector::new(StorageType::Integral);
        reader.read_vector(0, &mut longs).unwrap();

        let mut texts = TypedVector::new(StorageType::Text);
        let err = reader.read_vector(1, &mut texts).unwrap_err();
        assert!(matches!(err, StorageError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_failed_read_leaves_vector_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stale.strata");
        write_file(&path, 20, 10);

        let offset = {
            let reader = BatchReader::open(&path, ReaderConfig::default(), codecs()).unwrap();
            reader.stripes()[1].streams[1].offset as usize
        };
        let mut bytes = fs::read(&path).unwrap();
        bytes[offset + 3] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        let mut reader = BatchReader::open(&path, ReaderConfig::default(), codecs()).unwrap();
        let mut texts = TypedVector::new(StorageType::Text);
        assert_eq!(reader.next_batch().unwrap(), Some(10));
        reader.read_vector(1, &mut texts).unwrap();
        assert_eq!(texts.len(), 10);

        assert_eq!(reader.next_batch().unwrap(), Some(10));
        let err = reader.read_vector(1, &mut texts).unwrap_err();
        assert!(err.is_corruption());
        assert!(texts.is_empty());

        let mut longs = TypedVector::new(StorageType::Integral);
        reader.read_vector(0, &mut longs).unwrap();
        assert_eq!(longs.len(), 10);
        let err = reader.read_vector(1, &mut longs).unwrap_err();
        assert!(err.is_schema_mismatch());
        assert!(longs.is_empty());
    }

    #[test]
    fn test_missing_codec_at_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zstd.strata");
        let config = WriterConfig::new()
            .with_compression(CompressionKind::Zstd)
            .with_sync_on_close(false);
        let mut writer = FileWriter::create(&path, schema(), config, codecs()).unwrap();
        for i in 0..500 {
            writer
                .append_row(&[Value::Integral(i % 3), Value::Text("repetitive text value")])
                .unwrap();
        }
        writer.close().unwrap();

        let only_passthrough = Arc::new(
            CodecRegistry::empty().with_codec(Arc::new(crate::codec::PassthroughCodec)),
        );
        let mut reader = BatchReader::open(&path, ReaderConfig::default(), only_passthrough).unwrap();
        assert_eq!(reader.stripes()[0].streams[1].codec, CompressionKind::Zstd);
        reader.next_batch().unwrap();
        let mut texts = TypedVector::new(StorageType::Text);
        let err = reader.read_vector(1, &mut texts).unwrap_err();
        assert!(matches!(
            err,
            StorageError::CodecUnavailable {
                kind: CompressionKind::Zstd
            }
        ));
    }

    #[test]
    fn test_invalid_batch_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg.strata");
        write_file(&path, 1, 10);
        let err = BatchReader::open(&path, ReaderConfig::new().with_batch_size(0), codecs())
            .unwrap_err();
        assert!(matches!(err, StorageError::ConfigError { .. }));
    }
}

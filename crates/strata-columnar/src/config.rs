//! Writer and reader configuration.
//!
//! Both configs are plain data with builder-style setters. They deserialize
//! from TOML with every field optional:
//!
//! ```toml
//! [writer]
//! stripe_max_rows = 50000
//! compression = "zstd"
//!
//! [reader]
//! batch_size = 512
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_common::constants::{DEFAULT_STRIPE_MAX_ROWS, DEFAULT_WRITE_BUFFER_SIZE, MAX_BATCH_SIZE};

use crate::codec::CompressionKind;
use crate::error::{StorageError, StorageResult};

/// Configuration for a file writer and the row sink on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriterConfig {
    /// Number of rows buffered before a stripe is flushed to disk.
    pub stripe_max_rows: usize,

    /// Compression applied to each column stream.
    pub compression: CompressionKind,

    /// Whether to fsync the file before `close` returns.
    pub sync_on_close: bool,

    /// Initial capacity of each variable-length encoder buffer, in bytes.
    pub initial_buffer_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            stripe_max_rows: DEFAULT_STRIPE_MAX_ROWS,
            compression: CompressionKind::None,
            sync_on_close: true,
            initial_buffer_capacity: DEFAULT_WRITE_BUFFER_SIZE,
        }
    }
}

impl WriterConfig {
    /// Creates a writer configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of rows per stripe.
    #[must_use]
    pub fn with_stripe_max_rows(mut self, rows: usize) -> Self {
        self.stripe_max_rows = rows;
        self
    }

    /// Sets the stream compression.
    #[must_use]
    pub fn with_compression(mut self, compression: CompressionKind) -> Self {
        self.compression = compression;
        self
    }

    /// Sets whether to fsync on close.
    #[must_use]
    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    /// Sets the initial variable-length buffer capacity.
    #[must_use]
    pub fn with_initial_buffer_capacity(mut self, capacity: usize) -> Self {
        self.initial_buffer_capacity = capacity;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StorageResult<()> {
        if self.stripe_max_rows == 0 {
            return Err(StorageError::config_error(
                "stripe_max_rows must be positive",
            ));
        }
        if self.stripe_max_rows > u32::MAX as usize {
            return Err(StorageError::config_error(format!(
                "stripe_max_rows must be at most {}",
                u32::MAX
            )));
        }
        Ok(())
    }
}

/// Configuration for a batch reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Maximum number of rows per batch (1..=`MAX_BATCH_SIZE`).
    pub batch_size: usize,

    /// Whether to verify stream checksums when a column is loaded.
    pub verify_checksums: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            verify_checksums: true,
        }
    }
}

impl ReaderConfig {
    /// Creates a reader configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets whether to verify stream checksums.
    #[must_use]
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StorageResult<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(StorageError::config_error(format!(
                "batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        Ok(())
    }
}

/// Combined configuration, as loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrataConfig {
    /// Writer settings.
    pub writer: WriterConfig,
    /// Reader settings.
    pub reader: ReaderConfig,
}

impl StrataConfig {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(text: &str) -> StorageResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| StorageError::config_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file and validates it.
    pub fn from_file(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            StorageError::config_error(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> StorageResult<String> {
        toml::to_string_pretty(self).map_err(|e| StorageError::config_error(e.to_string()))
    }

    /// Validates both sections.
    pub fn validate(&self) -> StorageResult<()> {
        self.writer.validate()?;
        self.reader.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StrataConfig::default();
        config.validate().unwrap();
        assert_eq!(config.writer.stripe_max_rows, DEFAULT_STRIPE_MAX_ROWS);
        assert_eq!(config.reader.batch_size, MAX_BATCH_SIZE);
        assert!(config.writer.sync_on_close);
    }

    #[test]
    fn test_builder() {
        let writer = WriterConfig::new()
            .with_stripe_max_rows(100)
            .with_compression(CompressionKind::Lz4)
            .with_sync_on_close(false);
        assert_eq!(writer.stripe_max_rows, 100);
        assert_eq!(writer.compression, CompressionKind::Lz4);
        assert!(!writer.sync_on_close);
        writer.validate().unwrap();

        assert!(WriterConfig::new().with_stripe_max_rows(0).validate().is_err());
    }

    #[test]
    fn test_batch_size_bounds() {
        assert!(ReaderConfig::new().with_batch_size(0).validate().is_err());
        assert!(ReaderConfig::new().with_batch_size(1).validate().is_ok());
        assert!(ReaderConfig::new()
            .with_batch_size(MAX_BATCH_SIZE)
            .validate()
            .is_ok());
        assert!(ReaderConfig::new()
            .with_batch_size(MAX_BATCH_SIZE + 1)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = StrataConfig::from_toml_str(
            r#"
            [writer]
            stripe_max_rows = 500
            compression = "zstd"

            [reader]
            batch_size = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.writer.stripe_max_rows, 500);
        assert_eq!(config.writer.compression, CompressionKind::Zstd);
        assert!(config.writer.sync_on_close);
        assert_eq!(config.reader.batch_size, 64);
        assert!(config.reader.verify_checksums);
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        let err = StrataConfig::from_toml_str("[reader]\nbatch_size = 4096\n").unwrap_err();
        assert!(matches!(err, StorageError::ConfigError { .. }));

        let err = StrataConfig::from_toml_str("[writer]\ncompression = \"snappy\"\n").unwrap_err();
        assert!(matches!(err, StorageError::ConfigError { .. }));

        assert!(StrataConfig::from_toml_str("[writer]\nstripe_rows = 5\n").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = StrataConfig {
            writer: WriterConfig::new().with_compression(CompressionKind::Lz4),
            reader: ReaderConfig::new().with_batch_size(10),
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(StrataConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("strata.toml");
        std::fs::write(&path, "[writer]\nsync_on_close = false\n").unwrap();

        let config = StrataConfig::from_file(&path).unwrap();
        assert!(!config.writer.sync_on_close);

        assert!(StrataConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}

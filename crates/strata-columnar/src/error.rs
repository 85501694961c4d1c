//! Columnar storage error types.
//!
//! This module defines all error types raised by the row sink, the file
//! writer and the batch reader. Exhausting a reader is not an error: it is
//! signalled by `BatchReader::next_batch` returning `Ok(None)`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CompressionKind;

/// Result type for columnar storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while writing or reading columnar files.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum StorageError {
    /// Wrong-typed append, wrong append count, or other protocol misuse.
    #[error("schema mismatch: {reason}")]
    SchemaMismatch { reason: String },

    /// I/O error while flushing or finalizing a file.
    #[error("write to {path} failed: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O error while reading a file.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// File is truncated, unfinalized or structurally invalid.
    #[error("corrupt file {path}: {reason}")]
    CorruptFile { path: PathBuf, reason: String },

    /// Invalid magic bytes.
    #[error("invalid magic in {path}: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic {
        path: PathBuf,
        expected: [u8; 8],
        found: [u8; 8],
    },

    /// Unsupported format version.
    #[error("unsupported format version in {path}: expected {expected}, found {found}")]
    UnsupportedVersion {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    /// Stored checksum does not match the bytes read back.
    #[error("checksum mismatch in {what}: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        what: String,
        expected: u32,
        computed: u32,
    },

    /// The codec registry has no codec for the requested kind.
    #[error("no codec registered for {kind}")]
    CodecUnavailable { kind: CompressionKind },

    /// A codec failed to compress or decompress a stream.
    #[error("{kind} codec failed: {reason}")]
    Compression {
        kind: CompressionKind,
        reason: String,
    },

    /// Invalid caller-supplied argument.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The sink already failed and can no longer be used.
    #[error("row sink is unusable after an earlier failure")]
    SinkFailed,

    /// A stripe write failed part way; the file writer can no longer be used.
    #[error("file writer is unusable after an earlier failure")]
    WriterFailed,

    /// `read_vector` was called without a current batch.
    #[error("no active batch: call next_batch before read_vector")]
    NoActiveBatch,

    /// Configuration error.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl StorageError {
    /// Creates a schema mismatch error.
    pub fn schema_mismatch(reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            reason: reason.into(),
        }
    }

    /// Creates a write failure error.
    pub fn write_failure(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::WriteFailure {
            path: path.into(),
            source,
        }
    }

    /// Creates a corrupt file error.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a checksum mismatch error.
    pub fn checksum_mismatch(what: impl Into<String>, expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch {
            what: what.into(),
            expected,
            computed,
        }
    }

    /// Creates a compression error.
    pub fn compression(kind: CompressionKind, reason: impl Into<String>) -> Self {
        Self::Compression {
            kind,
            reason: reason.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Creates a config error.
    pub fn config_error(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
        }
    }

    /// Returns true if this error reports a damaged or incomplete file.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::CorruptFile { .. }
                | Self::InvalidMagic { .. }
                | Self::UnsupportedVersion { .. }
                | Self::ChecksumMismatch { .. }
        )
    }

    /// Returns true if this error is a caller protocol violation.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::SchemaMismatch { .. })
    }

    /// Returns true if this error is an I/O failure on the write path.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::WriteFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = StorageError::corrupt("/tmp/a.strata", "missing tail");
        assert!(err.is_corruption());
        assert!(!err.is_schema_mismatch());

        let err = StorageError::checksum_mismatch("footer", 0x1234, 0x5678);
        assert!(err.is_corruption());

        let err = StorageError::schema_mismatch("expected text");
        assert!(err.is_schema_mismatch());
        assert!(!err.is_corruption());

        let err = StorageError::write_failure("/tmp/a.strata", io::Error::other("disk full"));
        assert!(err.is_write_failure());
        assert!(!err.is_corruption());
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::checksum_mismatch("stripe 0 column 2", 0xdead, 0xbeef);
        let msg = err.to_string();
        assert!(msg.contains("stripe 0 column 2"));
        assert!(msg.contains("0x0000dead"));

        let err = StorageError::CodecUnavailable {
            kind: CompressionKind::Zstd,
        };
        assert!(err.to_string().contains("zstd"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: StorageError = io_err.into();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}

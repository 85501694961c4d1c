//! Stream compression codecs.
//!
//! Column streams are compressed independently. The codec used for a stream
//! is recorded next to it in the stripe directory, and readers look it up in
//! the `CodecRegistry` they were constructed with. Writers and readers never
//! resolve codecs from process-wide or thread-local state.

mod context;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_common::COMPRESS_MIN_STREAM_SIZE;

use crate::error::{StorageError, StorageResult};

pub use context::{scoped_registry, ThreadCodecScope};

/// Compression applied to a column stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CompressionKind {
    /// Stored as-is.
    #[default]
    None = 0,
    /// LZ4 block format.
    Lz4 = 1,
    /// Zstandard.
    Zstd = 2,
}

impl CompressionKind {
    /// All compression kinds, in tag order.
    pub const ALL: [CompressionKind; 3] = [Self::None, Self::Lz4, Self::Zstd];

    /// Converts the kind to its on-disk tag.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Creates a kind from its on-disk tag.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::None),
            1 => Some(Self::Lz4),
            2 => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Returns the lowercase name of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
        }
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Self::None),
            "lz4" => Ok(Self::Lz4),
            "zstd" | "zstandard" => Ok(Self::Zstd),
            other => Err(StorageError::config_error(format!(
                "unsupported compression: {} (supported: none, lz4, zstd)",
                other
            ))),
        }
    }
}

/// A stream compression codec.
pub trait Codec: Send + Sync + fmt::Debug {
    /// The kind recorded for streams this codec produced.
    fn kind(&self) -> CompressionKind;

    /// Compresses a whole stream.
    fn compress(&self, input: &[u8]) -> StorageResult<Vec<u8>>;

    /// Decompresses a stream whose decoded size is known to be `raw_len`.
    fn decompress(&self, input: &[u8], raw_len: usize) -> StorageResult<Vec<u8>>;
}

/// Identity codec for uncompressed streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCodec;

impl Codec for PassthroughCodec {
    fn kind(&self) -> CompressionKind {
        CompressionKind::None
    }

    fn compress(&self, input: &[u8]) -> StorageResult<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn decompress(&self, input: &[u8], raw_len: usize) -> StorageResult<Vec<u8>> {
        if input.len() != raw_len {
            return Err(StorageError::compression(
                CompressionKind::None,
                format!("stored {} bytes, expected {}", input.len(), raw_len),
            ));
        }
        Ok(input.to_vec())
    }
}

/// LZ4 block codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn kind(&self) -> CompressionKind {
        CompressionKind::Lz4
    }

    fn compress(&self, input: &[u8]) -> StorageResult<Vec<u8>> {
        Ok(lz4_flex::block::compress(input))
    }

    fn decompress(&self, input: &[u8], raw_len: usize) -> StorageResult<Vec<u8>> {
        lz4_flex::block::decompress(input, raw_len)
            .map_err(|e| StorageError::compression(CompressionKind::Lz4, e.to_string()))
    }
}

/// Zstandard codec.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    /// Default compression level.
    pub const DEFAULT_LEVEL: i32 = 3;

    /// Creates a codec compressing at the given level.
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEVEL)
    }
}

impl Codec for ZstdCodec {
    fn kind(&self) -> CompressionKind {
        CompressionKind::Zstd
    }

    fn compress(&self, input: &[u8]) -> StorageResult<Vec<u8>> {
        zstd::bulk::compress(input, self.level)
            .map_err(|e| StorageError::compression(CompressionKind::Zstd, e.to_string()))
    }

    fn decompress(&self, input: &[u8], raw_len: usize) -> StorageResult<Vec<u8>> {
        let out = zstd::bulk::decompress(input, raw_len)
            .map_err(|e| StorageError::compression(CompressionKind::Zstd, e.to_string()))?;
        if out.len() != raw_len {
            return Err(StorageError::compression(
                CompressionKind::Zstd,
                format!("decoded {} bytes, expected {}", out.len(), raw_len),
            ));
        }
        Ok(out)
    }
}

/// Table of codecs available to a writer or reader.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strata_columnar::codec::{CodecRegistry, CompressionKind};
///
/// let codecs = Arc::new(CodecRegistry::builtin());
/// assert!(codecs.contains(CompressionKind::Zstd));
/// assert!(!CodecRegistry::empty().contains(CompressionKind::None));
/// ```
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: [Option<Arc<dyn Codec>>; 3],
}

impl CodecRegistry {
    /// Creates a registry with no codecs at all.
    pub fn empty() -> Self {
        Self {
            codecs: [None, None, None],
        }
    }

    /// Creates a registry holding the passthrough, LZ4 and Zstandard codecs.
    pub fn builtin() -> Self {
        Self::empty()
            .with_codec(Arc::new(PassthroughCodec))
            .with_codec(Arc::new(Lz4Codec))
            .with_codec(Arc::new(ZstdCodec::default()))
    }

    /// Registers a codec, replacing any codec of the same kind.
    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.register(codec);
        self
    }

    /// Registers a codec, replacing any codec of the same kind.
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        let slot = codec.kind().slot();
        self.codecs[slot] = Some(codec);
    }

    /// Returns true if a codec of the given kind is registered.
    pub fn contains(&self, kind: CompressionKind) -> bool {
        self.codecs[kind.slot()].is_some()
    }

    /// Looks up the codec for `kind`.
    pub fn resolve(&self, kind: CompressionKind) -> StorageResult<&dyn Codec> {
        self.codecs[kind.slot()]
            .as_deref()
            .ok_or(StorageError::CodecUnavailable { kind })
    }

    /// Returns the registered kinds.
    pub fn kinds(&self) -> Vec<CompressionKind> {
        CompressionKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Compresses `body` with `codec` when that actually shrinks it.
///
/// Returns the kind to record for the stream and the bytes to store.
pub(crate) fn compress_stream(
    codec: &dyn Codec,
    body: Vec<u8>,
) -> StorageResult<(CompressionKind, Vec<u8>)> {
    if body.len() < COMPRESS_MIN_STREAM_SIZE || codec.kind() == CompressionKind::None {
        return Ok((CompressionKind::None, body));
    }
    let compressed = codec.compress(&body)?;
    if compressed.len() < body.len() {
        Ok((codec.kind(), compressed))
    } else {
        Ok((CompressionKind::None, body))
    }
}

//! Format-wide constants for strata.
//!
//! Changing any of the on-disk values below is a format break and requires a
//! `FORMAT_VERSION` bump.

// =============================================================================
// File Layout
// =============================================================================

/// Magic bytes at offset 0 of every columnar file.
pub const FILE_MAGIC: [u8; 8] = *b"STRATA\0\x01";

/// Magic bytes closing every finalized columnar file.
///
/// The tail is written last, so a file without these trailing bytes was never
/// finalized.
pub const TAIL_MAGIC: [u8; 8] = *b"STRATEND";

/// Version number of the columnar file format.
pub const FORMAT_VERSION: u32 = 1;

/// File header size in bytes.
///
/// Contains: magic (8), version (4), reserved (4) = 16 bytes.
pub const FILE_HEADER_SIZE: usize = 16;

/// File tail size in bytes.
///
/// Contains: footer length (8), footer checksum (4), version (4),
/// magic (8) = 24 bytes.
pub const FILE_TAIL_SIZE: usize = 24;

/// Maximum footer size accepted by readers (64 MB).
pub const MAX_FOOTER_SIZE: u64 = 64 * 1024 * 1024;

/// Maximum decoded size of one column stream accepted by readers (1 GB).
pub const MAX_STREAM_SIZE: u64 = 1024 * 1024 * 1024;

// =============================================================================
// Batching
// =============================================================================

/// Capacity of every typed vector, and the upper bound for a reader batch.
pub const MAX_BATCH_SIZE: usize = 1024;

/// Default number of rows buffered before a stripe is flushed.
pub const DEFAULT_STRIPE_MAX_ROWS: usize = 10_000;

/// Default buffer size for file writes (64 KB).
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Streams smaller than this are never compressed.
pub const COMPRESS_MIN_STREAM_SIZE: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(FILE_MAGIC.len() + 4 + 4, FILE_HEADER_SIZE);
        assert_eq!(8 + 4 + 4 + TAIL_MAGIC.len(), FILE_TAIL_SIZE);
        assert_ne!(FILE_MAGIC, TAIL_MAGIC);
    }

    #[test]
    fn test_batch_constants() {
        assert!(MAX_BATCH_SIZE.is_power_of_two());
        assert!(DEFAULT_STRIPE_MAX_ROWS >= MAX_BATCH_SIZE);
    }
}

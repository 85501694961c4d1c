//! Stream and footer checksum utilities.
//!
//! Uses CRC32 (crc32fast picks the hardware-accelerated path when available).
//! Every checksum lives inside the file it protects.

/// Computes a CRC32 checksum for the given data.
///
/// # Example
///
/// ```rust
/// use strata_columnar::checksum::compute_checksum;
///
/// let data = b"stripe bytes";
/// assert_eq!(compute_checksum(data), compute_checksum(data));
/// ```
#[inline]
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Represents a checksum verification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumResult {
    /// Checksum is valid.
    Valid,
    /// Checksum is invalid (data corruption detected).
    Invalid {
        /// The checksum stored in the file.
        expected: u32,
        /// The checksum computed over the bytes read.
        computed: u32,
    },
}

impl ChecksumResult {
    /// Checks `data` against the stored checksum.
    pub fn check(data: &[u8], expected: u32) -> Self {
        let computed = compute_checksum(data);
        if computed == expected {
            Self::Valid
        } else {
            Self::Invalid { expected, computed }
        }
    }

    /// Returns true if the checksum is valid.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

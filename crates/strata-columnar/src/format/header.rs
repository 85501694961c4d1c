//! Fixed-size file header and tail.

use std::path::Path;

use bytes::{Buf, BufMut};
use strata_common::constants::{
    FILE_HEADER_SIZE, FILE_MAGIC, FILE_TAIL_SIZE, FORMAT_VERSION, MAX_FOOTER_SIZE, TAIL_MAGIC,
};

use crate::error::{StorageError, StorageResult};

/// File header (16 bytes).
///
/// Layout:
/// - magic: 8 bytes
/// - version: 4 bytes
/// - reserved: 4 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version the file was written with.
    pub version: u32,
}

impl FileHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = FILE_HEADER_SIZE;

    /// Creates a header for the current format version.
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION,
        }
    }

    /// Serializes the header.
    pub fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_slice(&FILE_MAGIC);
        buf.put_u32_le(self.version);
        buf.put_u32_le(0); // reserved
    }

    /// Serializes the header to a byte array.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        let mut cursor = &mut buf[..];
        self.serialize(&mut cursor);
        buf
    }

    /// Parses and validates a header read from `path`.
    pub fn from_bytes(bytes: &[u8], path: &Path) -> StorageResult<Self> {
        if bytes.len() < Self::SIZE {
            return Err(StorageError::corrupt(
                path,
                format!("file header needs {} bytes, found {}", Self::SIZE, bytes.len()),
            ));
        }
        let mut buf = bytes;
        let mut magic = [0u8; 8];
        buf.copy_to_slice(&mut magic);
        if magic != FILE_MAGIC {
            return Err(StorageError::InvalidMagic {
                path: path.to_path_buf(),
                expected: FILE_MAGIC,
                found: magic,
            });
        }
        let version = buf.get_u32_le();
        if version != FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                path: path.to_path_buf(),
                expected: FORMAT_VERSION,
                found: version,
            });
        }
        let _reserved = buf.get_u32_le();
        Ok(Self { version })
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// File tail (24 bytes), written after the footer as the last bytes of a
/// finalized file.
///
/// Layout:
/// - footer_len: 8 bytes
/// - footer_checksum: 4 bytes (CRC32 of the footer)
/// - version: 4 bytes
/// - magic: 8 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTail {
    /// Length of the footer in bytes.
    pub footer_len: u64,
    /// CRC32 of the footer bytes.
    pub footer_checksum: u32,
    /// Format version, repeated from the header.
    pub version: u32,
}

impl FileTail {
    /// Size of the tail in bytes.
    pub const SIZE: usize = FILE_TAIL_SIZE;

    /// Creates a tail describing a footer.
    pub fn new(footer_len: u64, footer_checksum: u32) -> Self {
        Self {
            footer_len,
            footer_checksum,
            version: FORMAT_VERSION,
        }
    }

    /// Serializes the tail.
    pub fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.footer_len);
        buf.put_u32_le(self.footer_checksum);
        buf.put_u32_le(self.version);
        buf.put_slice(&TAIL_MAGIC);
    }

    /// Serializes the tail to a byte array.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        let mut cursor = &mut buf[..];
        self.serialize(&mut cursor);
        buf
    }

    /// Parses and validates a tail read from the end of `path`.
    ///
    /// A missing tail magic means the writer never finalized the file.
    pub fn from_bytes(bytes: &[u8], path: &Path) -> StorageResult<Self> {
        if bytes.len() != Self::SIZE {
            return Err(StorageError::corrupt(
                path,
                format!("file tail needs {} bytes, found {}", Self::SIZE, bytes.len()),
            ));
        }
        if bytes[Self::SIZE - TAIL_MAGIC.len()..] != TAIL_MAGIC {
            return Err(StorageError::corrupt(
                path,
                "missing tail magic, file was not finalized",
            ));
        }
        let mut buf = bytes;
        let footer_len = buf.get_u64_le();
        let footer_checksum = buf.get_u32_le();
        let version = buf.get_u32_le();
        if version != FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                path: path.to_path_buf(),
                expected: FORMAT_VERSION,
                found: version,
            });
        }
        if footer_len == 0 || footer_len > MAX_FOOTER_SIZE {
            return Err(StorageError::corrupt(
                path,
                format!("implausible footer length {}", footer_len),
            ));
        }
        Ok(Self {
            footer_len,
            footer_checksum,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> &'static Path {
        Path::new("/tmp/test.strata")
    }

    #[test]
    fn test_header_roundtrip() {
        let bytes = FileHeader::new().to_bytes();
        assert_eq!(&bytes[..8], &FILE_MAGIC);
        assert_eq!(FileHeader::from_bytes(&bytes, path()).unwrap(), FileHeader::new());
    }

    #[test]
    fn test_header_bad_magic() {
        let mut bytes = FileHeader::new().to_bytes();
        bytes[0] = b'X';
        let err = FileHeader::from_bytes(&bytes, path()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidMagic { .. }));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_header_bad_version() {
        let header = FileHeader { version: 99 };
        let err = FileHeader::from_bytes(&header.to_bytes(), path()).unwrap_err();
        assert!(matches!(
            err,
            StorageError::UnsupportedVersion { found: 99, .. }
        ));
    }

    #[test]
    fn test_header_short() {
        let err = FileHeader::from_bytes(&[0u8; 4], path()).unwrap_err();
        assert!(matches!(err, StorageError::CorruptFile { .. }));
    }

    #[test]
    fn test_tail_roundtrip() {
        let tail = FileTail::new(120, 0xabcd_ef01);
        let bytes = tail.to_bytes();
        assert_eq!(&bytes[16..], &TAIL_MAGIC);
        assert_eq!(FileTail::from_bytes(&bytes, path()).unwrap(), tail);
    }

    #[test]
    fn test_tail_missing_magic() {
        let mut bytes = FileTail::new(120, 1).to_bytes();
        bytes[23] ^= 0xff;
        let err = FileTail::from_bytes(&bytes, path()).unwrap_err();
        assert!(err.to_string().contains("not finalized"));
    }

    #[test]
    fn test_tail_implausible_length() {
        let bytes = FileTail::new(0, 1).to_bytes();
        assert!(FileTail::from_bytes(&bytes, path()).is_err());

        let bytes = FileTail::new(MAX_FOOTER_SIZE + 1, 1).to_bytes();
        assert!(FileTail::from_bytes(&bytes, path()).is_err());
    }
}

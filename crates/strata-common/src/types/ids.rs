//! Column identifier type.
//!
//! Column ids are assigned by the catalog that owns a table and are carried
//! verbatim into every file written for that table, so a reader can map file
//! columns back to table columns without any sidecar metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column identifier - uniquely identifies a column within a table.
///
/// # Example
///
/// ```rust
/// use strata_common::types::ColumnId;
///
/// let column = ColumnId::new(42);
/// assert_eq!(column.as_u64(), 42);
/// assert_eq!(ColumnId::from_le_bytes(column.to_le_bytes()), column);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct ColumnId(u64);

impl ColumnId {
    /// Creates a new `ColumnId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Creates a ColumnId from bytes (little-endian, the on-disk order).
    #[inline]
    #[must_use]
    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    /// Converts to bytes (little-endian, the on-disk order).
    #[inline]
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl fmt::Debug for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnId({})", self.0)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ColumnId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<ColumnId> for u64 {
    #[inline]
    fn from(id: ColumnId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_id() {
        let id = ColumnId::new(100);
        assert_eq!(id.as_u64(), 100);
        assert_eq!(u64::from(id), 100);
        assert_eq!(ColumnId::from(100u64), id);

        let bytes = id.to_le_bytes();
        assert_eq!(bytes[0], 100);
        assert_eq!(ColumnId::from_le_bytes(bytes), id);
    }

    #[test]
    fn test_formatting() {
        let id = ColumnId::new(7);
        assert_eq!(format!("{:?}", id), "ColumnId(7)");
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn test_ordering() {
        assert!(ColumnId::new(1) < ColumnId::new(2));
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&ColumnId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: ColumnId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ColumnId::new(9));
    }
}

//! Physical storage types.
//!
//! The file format supports exactly five storage types. Anything the query
//! engine can express is lowered onto one of these before it reaches a sink.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a tag or name does not denote a storage type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown storage type: {0}")]
pub struct UnknownStorageType(pub String);

/// Physical storage type of a column.
///
/// The discriminant is the tag written into file footers and must never be
/// renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum StorageType {
    /// 64-bit signed integer.
    Integral = 1,
    /// Variable-length UTF-8 text.
    Text = 2,
    /// Variable-length raw bytes.
    Opaque = 3,
    /// 64-bit IEEE-754 float.
    FloatingPoint = 4,
    /// Boolean.
    Boolean = 5,
}

impl StorageType {
    /// All storage types, in tag order.
    pub const ALL: [StorageType; 5] = [
        Self::Integral,
        Self::Text,
        Self::Opaque,
        Self::FloatingPoint,
        Self::Boolean,
    ];

    /// Converts the storage type to its on-disk tag.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Creates a storage type from its on-disk tag.
    pub fn from_u8(tag: u8) -> Result<Self, UnknownStorageType> {
        match tag {
            1 => Ok(Self::Integral),
            2 => Ok(Self::Text),
            3 => Ok(Self::Opaque),
            4 => Ok(Self::FloatingPoint),
            5 => Ok(Self::Boolean),
            other => Err(UnknownStorageType(format!("tag {}", other))),
        }
    }

    /// Returns the lowercase name used in tooling output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integral => "integral",
            Self::Text => "text",
            Self::Opaque => "opaque",
            Self::FloatingPoint => "floating_point",
            Self::Boolean => "boolean",
        }
    }

    /// Returns true for types whose values have a fixed width.
    #[must_use]
    pub const fn is_fixed_width(self) -> bool {
        matches!(self, Self::Integral | Self::FloatingPoint | Self::Boolean)
    }

    /// Returns true for length-prefixed types.
    #[must_use]
    pub const fn is_variable_length(self) -> bool {
        !self.is_fixed_width()
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StorageType {
    type Err = UnknownStorageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "integral" | "long" | "bigint" => Ok(Self::Integral),
            "text" | "string" | "varchar" => Ok(Self::Text),
            "opaque" | "bytes" | "varbinary" => Ok(Self::Opaque),
            "floating_point" | "double" => Ok(Self::FloatingPoint),
            "boolean" | "bool" => Ok(Self::Boolean),
            _ => Err(UnknownStorageType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for ty in StorageType::ALL {
            assert_eq!(StorageType::from_u8(ty.as_u8()).unwrap(), ty);
        }
        assert!(StorageType::from_u8(0).is_err());
        assert!(StorageType::from_u8(6).is_err());
    }

    #[test]
    fn test_tags_are_stable() {
        assert_eq!(StorageType::Integral.as_u8(), 1);
        assert_eq!(StorageType::Text.as_u8(), 2);
        assert_eq!(StorageType::Opaque.as_u8(), 3);
        assert_eq!(StorageType::FloatingPoint.as_u8(), 4);
        assert_eq!(StorageType::Boolean.as_u8(), 5);
    }

    #[test]
    fn test_width_classes() {
        assert!(StorageType::Integral.is_fixed_width());
        assert!(StorageType::FloatingPoint.is_fixed_width());
        assert!(StorageType::Boolean.is_fixed_width());
        assert!(StorageType::Text.is_variable_length());
        assert!(StorageType::Opaque.is_variable_length());
    }

    #[test]
    fn test_parse() {
        assert_eq!("long".parse::<StorageType>().unwrap(), StorageType::Integral);
        assert_eq!("DOUBLE".parse::<StorageType>().unwrap(), StorageType::FloatingPoint);
        assert_eq!("bytes".parse::<StorageType>().unwrap(), StorageType::Opaque);
        assert!("decimal".parse::<StorageType>().is_err());
    }

    #[test]
    fn test_display_matches_serde() {
        let json = serde_json::to_string(&StorageType::FloatingPoint).unwrap();
        assert_eq!(json, format!("\"{}\"", StorageType::FloatingPoint));
    }
}

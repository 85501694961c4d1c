//! # strata-common
//!
//! Common types and constants for strata.
//!
//! This crate provides the foundational vocabulary shared by the columnar
//! writer, the batch reader and the tooling built on top of them:
//!
//! - **Types**: `ColumnId` and the closed `StorageType` enum
//! - **Constants**: on-disk format magic numbers, versions and limits
//!
//! ## Example
//!
//! ```rust
//! use strata_common::types::{ColumnId, StorageType};
//!
//! let id = ColumnId::new(7);
//! assert_eq!(id.as_u64(), 7);
//! assert!(StorageType::Integral.is_fixed_width());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::{ColumnId, StorageType, UnknownStorageType};

//! Type definitions for strata.
//!
//! This module contains the core type definitions used across the workspace.

mod ids;
mod storage_type;

pub use ids::ColumnId;
pub use storage_type::{StorageType, UnknownStorageType};

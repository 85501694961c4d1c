//! # strata-test
//!
//! Integration tests for strata.
//!
//! This crate contains:
//! - Round-trip tests over every storage type
//! - Corruption and integrity tests
//! - Codec selection tests
//! - Shared fixtures for writing and reading whole files

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Row fixtures and file helpers
pub mod fixtures;

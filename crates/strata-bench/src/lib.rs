//! Strata Performance Benchmarks
//!
//! This crate contains benchmarks for the strata columnar file format:
//! - Column encoders (per storage type, with and without nulls)
//! - Row sink write throughput per codec
//! - Batch reader scan throughput per codec and batch size
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p strata-bench
//! ```

pub mod utils;

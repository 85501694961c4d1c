//! Integrity tests for strata files.
//!
//! These tests damage or abandon files in controlled ways and check that
//! the reader refuses them with a corruption error instead of returning
//! partial data.

use std::fs::OpenOptions;

use strata_columnar::{BatchReader, ReaderConfig, RowSink, StorageError, TypedVector};
use strata_common::types::StorageType;
use strata_test::fixtures::*;
use tempfile::TempDir;

fn write_scenario_a(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    write_file(
        &path,
        scenario_a_schema().unwrap(),
        &scenario_a_rows(),
        test_writer_config(),
        builtin_codecs(),
    )
    .unwrap();
    path
}

#[test]
fn test_scenario_c_truncated_footer() {
    let dir = TempDir::new().unwrap();
    let path = write_scenario_a(&dir, "truncated.strata");
    let len = std::fs::metadata(&path).unwrap().len();

    // Cut into the tail and the footer before it.
    for cut in [1u64, 10, 30] {
        let copy = dir.path().join(format!("cut-{}.strata", cut));
        std::fs::copy(&path, &copy).unwrap();
        OpenOptions::new()
            .write(true)
            .open(&copy)
            .unwrap()
            .set_len(len - cut)
            .unwrap();

        let err = BatchReader::open(&copy, ReaderConfig::default(), builtin_codecs()).unwrap_err();
        assert!(err.is_corruption(), "cut {}: unexpected error {:?}", cut, err);
    }
}

#[test]
fn test_unclosed_sink_leaves_unreadable_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("abandoned.strata");

    {
        let mut sink = RowSink::create(
            scenario_a_schema().unwrap(),
            &path,
            test_writer_config().with_stripe_max_rows(2),
            builtin_codecs(),
        )
        .unwrap();
        for row in scenario_a_rows() {
            write_row(&mut sink, &row).unwrap();
        }
        // Dropped without close: one full stripe reached disk, no footer did.
    }

    assert!(path.exists());
    let err = BatchReader::open(&path, ReaderConfig::default(), builtin_codecs()).unwrap_err();
    assert!(err.is_corruption(), "unexpected error {:?}", err);
}

#[test]
fn test_no_sidecar_files() {
    let dir = TempDir::new().unwrap();
    write_scenario_a(&dir, "one.strata");
    write_file(
        &dir.path().join("two.strata"),
        schema(&[(1, StorageType::Integral)]).unwrap(),
        &[],
        test_writer_config(),
        builtin_codecs(),
    )
    .unwrap();

    assert_eq!(
        dir_entries(dir.path()).unwrap(),
        vec!["one.strata".to_string(), "two.strata".to_string()]
    );
}

#[test]
fn test_flipped_stream_byte_fails_at_read_vector() {
    let dir = TempDir::new().unwrap();
    let path = write_scenario_a(&dir, "flipped.strata");

    let text_stream = {
        let reader = BatchReader::open(&path, ReaderConfig::default(), builtin_codecs()).unwrap();
        reader.stripes()[0].streams[1]
    };
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[text_stream.offset as usize + text_stream.stored_len as usize - 1] ^= 0x01;
    std::fs::write(&path, &bytes).unwrap();

    // Open only reads header, footer and tail, so it still succeeds.
    let mut reader = BatchReader::open(&path, ReaderConfig::default(), builtin_codecs()).unwrap();
    assert_eq!(reader.next_batch().unwrap(), Some(3));

    let mut longs = TypedVector::new(StorageType::Integral);
    reader.read_vector(0, &mut longs).unwrap();

    let mut texts = TypedVector::new(StorageType::Text);
    let err = reader.read_vector(1, &mut texts).unwrap_err();
    assert!(
        matches!(err, StorageError::ChecksumMismatch { .. }),
        "unexpected error {:?}",
        err
    );
    assert!(err.is_corruption());
}

#[test]
fn test_garbage_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.strata");
    std::fs::write(&path, vec![0x5Au8; 256]).unwrap();

    let err = BatchReader::open(&path, ReaderConfig::default(), builtin_codecs()).unwrap_err();
    assert!(matches!(err, StorageError::InvalidMagic { .. }));

    std::fs::write(&path, b"tiny").unwrap();
    let err = BatchReader::open(&path, ReaderConfig::default(), builtin_codecs()).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = BatchReader::open(
        dir.path().join("absent.strata"),
        ReaderConfig::default(),
        builtin_codecs(),
    )
    .unwrap_err();
    assert!(matches!(err, StorageError::Io { .. }), "unexpected error {:?}", err);
    assert!(!err.is_corruption());
}

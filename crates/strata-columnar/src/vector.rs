//! Typed vectors filled by the batch reader.
//!
//! Every vector has a fixed capacity of `MAX_BATCH_SIZE` rows and is reused
//! across batches. After `BatchReader::read_vector` the first `len()` rows
//! hold the batch; anything past that is stale.

use std::ops::Range;

use bytes::Bytes;
use strata_common::constants::MAX_BATCH_SIZE;
use strata_common::types::StorageType;

use crate::encoding::DecodedColumn;
use crate::error::{StorageError, StorageResult};

/// Fixed-width values with a parallel null-flag array.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveVector<T> {
    values: Box<[T]>,
    is_null: Box<[bool]>,
    len: usize,
}

/// Vector of 64-bit integers.
pub type LongVector = PrimitiveVector<i64>;
/// Vector of 64-bit floats.
pub type DoubleVector = PrimitiveVector<f64>;
/// Vector of booleans.
pub type BooleanVector = PrimitiveVector<bool>;

impl<T: Copy + Default> PrimitiveVector<T> {
    /// Creates an empty vector with `MAX_BATCH_SIZE` capacity.
    pub fn new() -> Self {
        Self {
            values: vec![T::default(); MAX_BATCH_SIZE].into_boxed_slice(),
            is_null: vec![false; MAX_BATCH_SIZE].into_boxed_slice(),
            len: 0,
        }
    }

    /// Rows in the current batch.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the vector holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of rows.
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Value slots of the current batch. Slots of null rows are unspecified.
    pub fn values(&self) -> &[T] {
        &self.values[..self.len]
    }

    /// Null flags of the current batch.
    pub fn nulls(&self) -> &[bool] {
        &self.is_null[..self.len]
    }

    /// Returns true if row `index` is null.
    pub fn is_null(&self, index: usize) -> bool {
        self.is_null[..self.len][index]
    }

    /// Returns true if any row of the current batch is null.
    pub fn has_nulls(&self) -> bool {
        self.nulls().iter().any(|n| *n)
    }

    /// Value of row `index`, `None` when null or out of range.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len || self.is_null[index] {
            None
        } else {
            Some(self.values[index])
        }
    }

    /// Iterates the current batch.
    pub fn iter(&self) -> impl Iterator<Item = Option<T>> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Empties the vector.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    fn load(&mut self, source: &[Option<T>]) {
        debug_assert!(source.len() <= self.capacity());
        for (i, cell) in source.iter().enumerate() {
            match cell {
                Some(v) => {
                    self.values[i] = *v;
                    self.is_null[i] = false;
                }
                None => {
                    self.values[i] = T::default();
                    self.is_null[i] = true;
                }
            }
        }
        self.len = source.len();
    }
}

impl<T: Copy + Default> Default for PrimitiveVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Variable-length values as nullable references into decoded stripe data.
///
/// A missing reference is a null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceVector {
    slices: Vec<Option<Bytes>>,
}

impl SliceVector {
    /// Creates an empty vector with `MAX_BATCH_SIZE` capacity.
    pub fn new() -> Self {
        Self {
            slices: Vec::with_capacity(MAX_BATCH_SIZE),
        }
    }

    /// Rows in the current batch.
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Returns true if the vector holds no rows.
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Returns true if row `index` is null.
    pub fn is_null(&self, index: usize) -> bool {
        self.slices[index].is_none()
    }

    /// Bytes of row `index`, `None` when null or out of range.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.slices.get(index).and_then(|s| s.as_deref())
    }

    /// Bytes of row `index` as a shared handle.
    pub fn get_bytes(&self, index: usize) -> Option<Bytes> {
        self.slices.get(index).cloned().flatten()
    }

    /// Row `index` as text.
    ///
    /// Returns `None` for nulls and for bytes that are not UTF-8, which can
    /// only happen in opaque columns.
    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Iterates the current batch.
    pub fn iter(&self) -> impl Iterator<Item = Option<&[u8]>> + '_ {
        self.slices.iter().map(|s| s.as_deref())
    }

    /// Empties the vector.
    pub fn clear(&mut self) {
        self.slices.clear();
    }

    fn load(&mut self, source: &[Option<Bytes>]) {
        self.slices.clear();
        self.slices.extend_from_slice(source);
    }
}

impl Default for SliceVector {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader-side buffer for one column of one batch.
///
/// # Example
///
/// ```rust
/// use strata_columnar::vector::TypedVector;
/// use strata_common::types::StorageType;
///
/// let vector = TypedVector::new(StorageType::Text);
/// assert_eq!(vector.storage_type(), StorageType::Text);
/// assert!(vector.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum TypedVector {
    /// Integral column.
    Integral(LongVector),
    /// Floating-point column.
    FloatingPoint(DoubleVector),
    /// Boolean column.
    Boolean(BooleanVector),
    /// Text column.
    Text(SliceVector),
    /// Opaque column.
    Opaque(SliceVector),
}

impl TypedVector {
    /// Creates an empty vector shaped for `storage_type`.
    pub fn new(storage_type: StorageType) -> Self {
        match storage_type {
            StorageType::Integral => Self::Integral(LongVector::new()),
            StorageType::FloatingPoint => Self::FloatingPoint(DoubleVector::new()),
            StorageType::Boolean => Self::Boolean(BooleanVector::new()),
            StorageType::Text => Self::Text(SliceVector::new()),
            StorageType::Opaque => Self::Opaque(SliceVector::new()),
        }
    }

    /// Storage type this vector is shaped for.
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::Integral(_) => StorageType::Integral,
            Self::FloatingPoint(_) => StorageType::FloatingPoint,
            Self::Boolean(_) => StorageType::Boolean,
            Self::Text(_) => StorageType::Text,
            Self::Opaque(_) => StorageType::Opaque,
        }
    }

    /// Rows in the current batch.
    pub fn len(&self) -> usize {
        match self {
            Self::Integral(v) => v.len(),
            Self::FloatingPoint(v) => v.len(),
            Self::Boolean(v) => v.len(),
            Self::Text(v) | Self::Opaque(v) => v.len(),
        }
    }

    /// Returns true if the vector holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if row `index` is null.
    pub fn is_null(&self, index: usize) -> bool {
        match self {
            Self::Integral(v) => v.is_null(index),
            Self::FloatingPoint(v) => v.is_null(index),
            Self::Boolean(v) => v.is_null(index),
            Self::Text(v) | Self::Opaque(v) => v.is_null(index),
        }
    }

    /// Empties the vector.
    pub fn clear(&mut self) {
        match self {
            Self::Integral(v) => v.clear(),
            Self::FloatingPoint(v) => v.clear(),
            Self::Boolean(v) => v.clear(),
            Self::Text(v) | Self::Opaque(v) => v.clear(),
        }
    }

    /// The integral vector, if this is one.
    pub fn as_long(&self) -> Option<&LongVector> {
        match self {
            Self::Integral(v) => Some(v),
            _ => None,
        }
    }

    /// The floating-point vector, if this is one.
    pub fn as_double(&self) -> Option<&DoubleVector> {
        match self {
            Self::FloatingPoint(v) => Some(v),
            _ => None,
        }
    }

    /// The boolean vector, if this is one.
    pub fn as_boolean(&self) -> Option<&BooleanVector> {
        match self {
            Self::Boolean(v) => Some(v),
            _ => None,
        }
    }

    /// The slice vector of a text or opaque column.
    pub fn as_slices(&self) -> Option<&SliceVector> {
        match self {
            Self::Text(v) | Self::Opaque(v) => Some(v),
            _ => None,
        }
    }

    /// Copies `rows` of a decoded stripe column into this vector.
    pub(crate) fn load(&mut self, column: &DecodedColumn, rows: Range<usize>) -> StorageResult<()> {
        if rows.len() > MAX_BATCH_SIZE || rows.end > column.len() {
            return Err(StorageError::invalid_argument(format!(
                "rows {:?} out of range for a column of {} rows",
                rows,
                column.len()
            )));
        }
        match (self, column) {
            (Self::Integral(v), DecodedColumn::Integral(src)) => v.load(&src[rows]),
            (Self::FloatingPoint(v), DecodedColumn::FloatingPoint(src)) => v.load(&src[rows]),
            (Self::Boolean(v), DecodedColumn::Boolean(src)) => v.load(&src[rows]),
            (Self::Text(v), DecodedColumn::Text(src)) => v.load(&src[rows]),
            (Self::Opaque(v), DecodedColumn::Opaque(src)) => v.load(&src[rows]),
            (vector, column) => {
                return Err(StorageError::schema_mismatch(format!(
                    "{} vector cannot hold a {} column",
                    vector.storage_type(),
                    column.storage_type()
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        for ty in StorageType::ALL {
            let vector = TypedVector::new(ty);
            assert_eq!(vector.storage_type(), ty);
            assert_eq!(vector.len(), 0);
        }
        assert_eq!(LongVector::new().capacity(), MAX_BATCH_SIZE);
    }

    #[test]
    fn test_load_primitive() {
        let column = DecodedColumn::Integral(vec![Some(1), None, Some(3), Some(4)]);
        let mut vector = TypedVector::new(StorageType::Integral);
        vector.load(&column, 1..4).unwrap();

        let longs = vector.as_long().unwrap();
        assert_eq!(longs.len(), 3);
        assert!(longs.is_null(0));
        assert_eq!(longs.get(1), Some(3));
        assert_eq!(longs.values()[2], 4);
        assert!(longs.has_nulls());
        assert_eq!(longs.iter().collect::<Vec<_>>(), vec![None, Some(3), Some(4)]);
    }

    #[test]
    fn test_reload_clears_stale_nulls() {
        let mut vector = TypedVector::new(StorageType::Boolean);
        vector
            .load(&DecodedColumn::Boolean(vec![None, None]), 0..2)
            .unwrap();
        vector
            .load(&DecodedColumn::Boolean(vec![Some(true), Some(false)]), 0..2)
            .unwrap();
        let bools = vector.as_boolean().unwrap();
        assert!(!bools.has_nulls());
        assert_eq!(bools.get(0), Some(true));
        assert_eq!(bools.get(1), Some(false));
        assert_eq!(bools.get(2), None);
    }

    #[test]
    fn test_load_slices() {
        let column = DecodedColumn::Text(vec![
            Some(Bytes::from_static(b"hello")),
            None,
            Some(Bytes::from_static(b"bye")),
        ]);
        let mut vector = TypedVector::new(StorageType::Text);
        vector.load(&column, 0..3).unwrap();

        let slices = vector.as_slices().unwrap();
        assert_eq!(slices.get_str(0), Some("hello"));
        assert!(slices.is_null(1));
        assert_eq!(slices.get(2), Some(&b"bye"[..]));
        assert_eq!(slices.get(3), None);
    }

    #[test]
    fn test_shape_mismatch() {
        let column = DecodedColumn::Opaque(vec![None]);
        let mut vector = TypedVector::new(StorageType::Text);
        let err = vector.load(&column, 0..1).unwrap_err();
        assert!(err.is_schema_mismatch());
    }

    #[test]
    fn test_out_of_range() {
        let column = DecodedColumn::FloatingPoint(vec![Some(1.0)]);
        let mut vector = TypedVector::new(StorageType::FloatingPoint);
        assert!(vector.load(&column, 0..2).is_err());
    }
}

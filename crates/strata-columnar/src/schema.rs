//! Column schema of a columnar file.

use std::collections::HashSet;
use std::fmt;

use strata_common::types::{ColumnId, StorageType};

use crate::error::{StorageError, StorageResult};

/// One declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnDescriptor {
    /// Column identifier.
    pub id: ColumnId,
    /// Physical storage type.
    pub storage_type: StorageType,
}

impl ColumnDescriptor {
    /// Creates a column descriptor.
    pub fn new(id: impl Into<ColumnId>, storage_type: StorageType) -> Self {
        Self {
            id: id.into(),
            storage_type,
        }
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.storage_type)
    }
}

/// Ordered, validated set of columns plus an optional sample-weight column.
///
/// When a sample-weight column is designated, files carry it as an extra
/// trailing `Integral` column after the declared ones.
///
/// # Example
///
/// ```rust
/// use strata_columnar::schema::ColumnSchema;
/// use strata_common::types::{ColumnId, StorageType};
///
/// let schema = ColumnSchema::new(
///     vec![ColumnId::new(1), ColumnId::new(2)],
///     vec![StorageType::Integral, StorageType::Text],
/// )
/// .unwrap()
/// .with_sample_weight_column(ColumnId::new(99))
/// .unwrap();
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.physical_column_count(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<ColumnDescriptor>,
    sample_weight_column: Option<ColumnId>,
}

impl ColumnSchema {
    /// Builds a schema from parallel id and type lists.
    pub fn new(ids: Vec<ColumnId>, types: Vec<StorageType>) -> StorageResult<Self> {
        if ids.len() != types.len() {
            return Err(StorageError::invalid_argument(format!(
                "{} column ids but {} storage types",
                ids.len(),
                types.len()
            )));
        }
        Self::from_columns(
            ids.into_iter()
                .zip(types)
                .map(|(id, ty)| ColumnDescriptor::new(id, ty)),
        )
    }

    /// Builds a schema from column descriptors.
    pub fn from_columns(columns: impl IntoIterator<Item = ColumnDescriptor>) -> StorageResult<Self> {
        let columns: Vec<ColumnDescriptor> = columns.into_iter().collect();
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.id) {
                return Err(StorageError::invalid_argument(format!(
                    "duplicate column id {}",
                    column.id
                )));
            }
        }
        Ok(Self {
            columns,
            sample_weight_column: None,
        })
    }

    /// Designates the column that persists each row's sample weight.
    pub fn with_sample_weight_column(mut self, id: ColumnId) -> StorageResult<Self> {
        if self.index_of(id).is_some() {
            return Err(StorageError::invalid_argument(format!(
                "sample weight column {} collides with a data column",
                id
            )));
        }
        self.sample_weight_column = Some(id);
        Ok(self)
    }

    /// Declared columns, in order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Returns the declared column at `index`.
    pub fn column(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    /// Number of declared columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if no columns are declared.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of the declared column with the given id.
    pub fn index_of(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    /// The designated sample-weight column, if any.
    pub fn sample_weight_column(&self) -> Option<ColumnId> {
        self.sample_weight_column
    }

    /// Number of columns stored in a file: declared columns plus the
    /// sample-weight column when one is designated.
    pub fn physical_column_count(&self) -> usize {
        self.columns.len() + usize::from(self.sample_weight_column.is_some())
    }

    /// Columns stored in a file, in stream order.
    pub fn physical_columns(&self) -> Vec<ColumnDescriptor> {
        let mut columns = self.columns.clone();
        if let Some(id) = self.sample_weight_column {
            columns.push(ColumnDescriptor::new(id, StorageType::Integral));
        }
        columns
    }
}

impl fmt::Display for ColumnSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", column)?;
        }
        f.write_str("]")?;
        if let Some(id) = self.sample_weight_column {
            write!(f, " weight={}", id)?;
        }
        Ok(())
    }
}

//! Tabular input contract handed to the pipeline by the upload collaborator.

use serde::Deserialize;
use serde_json::Value;

/// A rectangular dataset: named columns and rows of loosely-typed cells.
///
/// Cell typing is resolved by the column resolver; rows shorter than the
/// column list read as missing cells.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive exact lookup of a column index by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Cell at (`row`, `col`), if the row is long enough.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Iterator over one column's cells, top to bottom. Short rows yield
    /// `Value::Null`.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Value> {
        self.rows
            .iter()
            .map(move |row| row.get(col).unwrap_or(&Value::Null))
    }
}

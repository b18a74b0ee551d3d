use std::sync::Arc;

use crate::types::SqlValue;

/// Descriptor for one result column.
///
/// Always carries the driver-reported column name; the remaining metadata is
/// filled in with whatever the driver makes available.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldMeta {
    /// Column name as reported by the driver
    pub name: String,
    /// Driver-reported type name, if any
    pub type_name: Option<String>,
    /// Whether the column is nullable, if the driver reports it
    pub nullable: Option<bool>,
    /// Declared size of the column, if the driver reports it
    pub size: Option<u32>,
}

impl FieldMeta {
    /// A descriptor carrying only a column name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        FieldMeta {
            name: name.into(),
            ..FieldMeta::default()
        }
    }
}

/// A row from a query result.
///
/// Column names are shared across all rows of one statement's result wave.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    column_names: Arc<Vec<String>>,
    values: Vec<SqlValue>,
}

impl Row {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        Self {
            column_names,
            values,
        }
    }

    /// Get a value from the row by column name
    ///
    /// # Returns
    ///
    /// The value at the column, or None if the column wasn't found
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.column_names
            .iter()
            .position(|name| name == column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// The column names this row was read under, in result order.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// The row's values, in column order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An output-parameter value reported by the driver on request completion.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputValue {
    pub name: String,
    pub value: SqlValue,
    pub meta: Option<FieldMeta>,
}

/// The fully materialized result of one query.
///
/// Built up by the result aggregator while the driver streams events, and
/// frozen once the request completes. `row_count` stays `None` until the
/// terminal completion event arrives; readers must not trust it earlier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSnapshot {
    /// Column descriptors, accumulated across statement waves
    pub fields: Vec<FieldMeta>,
    /// Rows in arrival order
    pub rows: Vec<Row>,
    /// Final row count, set only on completion
    pub row_count: Option<u64>,
    /// Output-parameter values in arrival order
    pub output_values: Vec<OutputValue>,
    /// Always `None`; the TDS protocol has no last-insert-id notion
    pub last_insert_id: Option<u64>,
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A single generated field value.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Rows generated for one table, in the table's insert-column order.
///
/// Identifier columns are never present; the sink assigns them.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<GeneratedValue>>,
}

impl RowBatch {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_capacity(table: impl Into<String>, columns: Vec<String>, rows: usize) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: Vec::with_capacity(rows),
        }
    }

    /// Append a row. Its arity must match the column list.
    pub fn push(&mut self, row: Vec<GeneratedValue>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<GeneratedValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// All values of `column`, in row order.
    pub fn column_values(&self, column: &str) -> Vec<&GeneratedValue> {
        match self.column_index(column) {
            Some(idx) => self.rows.iter().map(|row| &row[idx]).collect(),
            None => Vec::new(),
        }
    }

    pub fn into_rows(self) -> Vec<Vec<GeneratedValue>> {
        self.rows
    }
}

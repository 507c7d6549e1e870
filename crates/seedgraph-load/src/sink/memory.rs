use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tracing::debug;

use seedgraph_core::{GeneratedValue, IdentifierRange, RowBatch, TableSpec};

use super::Sink;
use crate::errors::SinkError;

/// In-process sink with serial keys per table.
///
/// Enforced foreign keys are checked on insert, so a run against this sink
/// fails the same way a relational store would on a dangling reference.
/// Failures can be injected per table for testing fail-fast behaviour.
#[derive(Debug)]
pub struct MemorySink {
    schemas: BTreeSet<String>,
    tables: BTreeMap<String, MemoryTable>,
    first_key: i64,
    fail_ensure: BTreeSet<String>,
    fail_insert: BTreeSet<String>,
    ensure_calls: usize,
    insert_calls: Vec<String>,
    closed: bool,
}

#[derive(Debug)]
struct MemoryTable {
    spec: TableSpec,
    columns: Vec<String>,
    rows: Vec<Vec<GeneratedValue>>,
    keys: Vec<i64>,
    next_key: i64,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self {
            schemas: BTreeSet::new(),
            tables: BTreeMap::new(),
            first_key: 1,
            fail_ensure: BTreeSet::new(),
            fail_insert: BTreeSet::new(),
            ensure_calls: 0,
            insert_calls: Vec::new(),
            closed: false,
        }
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start every table's key sequence at `first_key`.
    pub fn with_first_key(mut self, first_key: i64) -> Self {
        self.first_key = first_key;
        self
    }

    /// Make `ensure_table` fail for the named table.
    pub fn fail_ensure_on(mut self, table: impl Into<String>) -> Self {
        self.fail_ensure.insert(table.into());
        self
    }

    /// Make `insert_batch` fail for the named table.
    pub fn fail_insert_on(mut self, table: impl Into<String>) -> Self {
        self.fail_insert.insert(table.into());
        self
    }

    pub fn schemas(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(String::as_str)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.rows.len())
    }

    /// Keys assigned to the table's rows, in insert order.
    pub fn keys(&self, table: &str) -> &[i64] {
        self.tables
            .get(table)
            .map(|t| t.keys.as_slice())
            .unwrap_or_default()
    }

    /// Stored values of one column, in insert order.
    pub fn column_values(&self, table: &str, column: &str) -> Vec<GeneratedValue> {
        let Some(stored) = self.tables.get(table) else {
            return Vec::new();
        };
        match stored.columns.iter().position(|name| name == column) {
            Some(idx) => stored.rows.iter().map(|row| row[idx].clone()).collect(),
            None => Vec::new(),
        }
    }

    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls
    }

    /// Tables `insert_batch` was called for, in call order.
    pub fn insert_calls(&self) -> &[String] {
        &self.insert_calls
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> Result<(), SinkError> {
        if self.closed {
            Err(SinkError::Closed)
        } else {
            Ok(())
        }
    }

    /// Values a child may reference in `parent.column`.
    fn referenceable(&self, parent: &str, column: &str) -> Option<BTreeSet<i64>> {
        let stored = self.tables.get(parent)?;
        let by_key = stored
            .spec
            .identifier_column()
            .is_some_and(|id| id.name == column);
        if by_key {
            return Some(stored.keys.iter().copied().collect());
        }
        let idx = stored.columns.iter().position(|name| name == column);
        Some(match idx {
            Some(idx) => stored
                .rows
                .iter()
                .filter_map(|row| row[idx].as_i64())
                .collect(),
            None => (1..=stored.rows.len() as i64).collect(),
        })
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn ensure_schema(&mut self, name: &str) -> Result<(), SinkError> {
        self.check_open()?;
        self.ensure_calls += 1;
        self.schemas.insert(name.to_string());
        Ok(())
    }

    async fn ensure_table(&mut self, table: &TableSpec) -> Result<(), SinkError> {
        self.check_open()?;
        self.ensure_calls += 1;
        let name = table.qualified_name();
        if self.fail_ensure.contains(&name) {
            return Err(SinkError::Rejected(format!("injected ensure failure for '{name}'")));
        }
        if let Some(schema) = &table.schema
            && !self.schemas.contains(schema)
        {
            return Err(SinkError::Rejected(format!("schema '{schema}' does not exist")));
        }
        for fk in table.foreign_keys.iter().filter(|fk| fk.enforced) {
            if !self.tables.contains_key(&fk.parent) {
                return Err(SinkError::Rejected(format!(
                    "referenced table '{}' does not exist",
                    fk.parent
                )));
            }
        }

        let first_key = self.first_key;
        self.tables.entry(name).or_insert_with(|| MemoryTable {
            spec: table.clone(),
            columns: table.insert_columns().map(|c| c.name.clone()).collect(),
            rows: Vec::new(),
            keys: Vec::new(),
            next_key: first_key,
        });
        Ok(())
    }

    async fn insert_batch(
        &mut self,
        table: &TableSpec,
        batch: RowBatch,
    ) -> Result<Option<IdentifierRange>, SinkError> {
        self.check_open()?;
        let name = table.qualified_name();
        self.insert_calls.push(name.clone());
        if self.fail_insert.contains(&name) {
            return Err(SinkError::Rejected(format!("injected insert failure for '{name}'")));
        }

        let stored = self
            .tables
            .get(&name)
            .ok_or_else(|| SinkError::Rejected(format!("table '{name}' does not exist")))?;
        if batch.columns() != stored.columns.as_slice() {
            return Err(SinkError::Rejected(format!(
                "column list does not match table '{name}'"
            )));
        }

        for fk in table.foreign_keys.iter().filter(|fk| fk.enforced) {
            let allowed = self
                .referenceable(&fk.parent, &fk.parent_column)
                .unwrap_or_default();
            for value in batch.column_values(&fk.column) {
                match value {
                    GeneratedValue::Null => {}
                    GeneratedValue::Int(key) if allowed.contains(key) => {}
                    other => {
                        return Err(SinkError::Rejected(format!(
                            "'{name}.{}' value {other:?} violates foreign key to '{}'",
                            fk.column, fk.parent
                        )));
                    }
                }
            }
        }

        if batch.is_empty() {
            return Ok(None);
        }

        let count = batch.len();
        let has_identifier = table.identifier_column().is_some();
        let stored = self
            .tables
            .get_mut(&name)
            .ok_or_else(|| SinkError::Rejected(format!("table '{name}' does not exist")))?;

        let range = if has_identifier {
            let start = stored.next_key;
            let (end, next_key) = i64::try_from(count)
                .ok()
                .and_then(|n| start.checked_add(n - 1))
                .and_then(|end| Some((end, end.checked_add(1)?)))
                .ok_or_else(|| {
                    SinkError::Rejected(format!(
                        "key sequence for '{name}' cannot fit {count} more rows"
                    ))
                })?;
            stored.keys.extend(start..=end);
            stored.next_key = next_key;
            IdentifierRange::new(start, end)
        } else {
            IdentifierRange::positional(count as u64)
        };
        stored.rows.extend(batch.into_rows());

        debug!(table = %name, rows = count, "memory insert");
        Ok(range)
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        Ok(())
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use seedgraph_core::{IdentifierRange, SchemaGraph, TableSpec};
use seedgraph_generate::{FieldGenerator, GenerationError, ParentRanges, RowGenerator};

use crate::errors::{LoadError, SinkError};
use crate::sink::Sink;

/// Row count per table: a global default plus per-table overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    pub default: usize,
    #[serde(default)]
    pub overrides: BTreeMap<String, usize>,
}

impl RowCounts {
    pub fn uniform(rows: usize) -> Self {
        Self {
            default: rows,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, table: impl Into<String>, rows: usize) -> Self {
        self.overrides.insert(table.into(), rows);
        self
    }

    pub fn for_table(&self, table: &str) -> usize {
        self.overrides.get(table).copied().unwrap_or(self.default)
    }
}

impl From<usize> for RowCounts {
    fn from(rows: usize) -> Self {
        Self::uniform(rows)
    }
}

/// Lifecycle of a table within one seeding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableState {
    Pending,
    SchemaEnsured,
    RowsGenerated,
    Inserted,
    RangeRecorded,
    SchemaEnsureFailed,
    InsertFailed,
}

/// Outcome for one seeded table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows_requested: usize,
    pub rows_inserted: u64,
    pub range: Option<IdentifierRange>,
}

/// Outcome of a completed seeding run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedReport {
    pub run_id: String,
    pub tables: Vec<TableReport>,
    pub ranges: BTreeMap<String, IdentifierRange>,
    pub duration_ms: u64,
}

impl SeedReport {
    pub fn rows_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_inserted).sum()
    }

    /// One human-readable line describing what was inserted where.
    pub fn summary(&self) -> String {
        let Some(first) = self.tables.first() else {
            return "Inserted 0 rows; no tables were seeded.".to_string();
        };
        let uniform = self
            .tables
            .iter()
            .all(|t| t.rows_inserted == first.rows_inserted);

        if uniform {
            let rows = first.rows_inserted;
            let names: Vec<String> = self.tables.iter().map(|t| format!("'{}'", t.table)).collect();
            format!("Inserted {rows} rows into {} tables.", names.join(", "))
        } else {
            let names: Vec<String> = self
                .tables
                .iter()
                .map(|t| format!("'{}' ({})", t.table, t.rows_inserted))
                .collect();
            format!(
                "Inserted {} rows into {} tables.",
                self.rows_inserted(),
                names.join(", ")
            )
        }
    }
}

/// Seeds a schema graph table by table in dependency order.
///
/// Every parent's identifier range is recorded before any of its children is
/// generated, so child foreign keys only reference committed keys. Each
/// table's insert is its own commit; a failure stops the run without undoing
/// tables that were already written.
#[derive(Debug)]
pub struct Loader<F> {
    rows: RowGenerator<F>,
    states: BTreeMap<String, TableState>,
    ranges: BTreeMap<String, IdentifierRange>,
}

impl<F: FieldGenerator> Loader<F> {
    pub fn new(rows: RowGenerator<F>) -> Self {
        Self {
            rows,
            states: BTreeMap::new(),
            ranges: BTreeMap::new(),
        }
    }

    /// Ranges recorded by the most recent run, including a failed one.
    pub fn ranges(&self) -> &BTreeMap<String, IdentifierRange> {
        &self.ranges
    }

    /// State of `table` at the end of the most recent run.
    pub fn state(&self, table: &str) -> Option<TableState> {
        self.states.get(table).copied()
    }

    /// Seed the graph and release the sink on every exit path.
    pub async fn run<S: Sink + ?Sized>(
        &mut self,
        graph: &SchemaGraph,
        counts: &RowCounts,
        sink: &mut S,
    ) -> Result<SeedReport, LoadError> {
        let outcome = self.seed(graph, counts, sink).await;
        let closed = sink.close().await;

        match (outcome, closed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(err)) => Err(LoadError::Close(err)),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(event = "sink_close_failed", error = %close_err);
                Err(err)
            }
        }
    }

    /// Seed every table of `graph` into `sink`, parents first.
    pub async fn seed<S: Sink + ?Sized>(
        &mut self,
        graph: &SchemaGraph,
        counts: &RowCounts,
        sink: &mut S,
    ) -> Result<SeedReport, LoadError> {
        let started = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        if graph.is_empty() {
            return Err(LoadError::Configuration(
                "schema graph has no tables to seed".to_string(),
            ));
        }
        let order = graph.topological_order()?;
        for table in counts.overrides.keys() {
            if !graph.contains(table) {
                return Err(LoadError::Configuration(format!(
                    "row count override for unknown table '{table}'"
                )));
            }
        }

        self.ranges.clear();
        self.states = order
            .iter()
            .map(|table| (table.qualified_name(), TableState::Pending))
            .collect();

        info!(
            event = "seed_started",
            run_id = %run_id,
            engine = sink.engine(),
            tables = order.len()
        );

        let mut ensured_schemas = BTreeSet::new();
        let mut tables = Vec::with_capacity(order.len());

        for table in order {
            let name = table.qualified_name();
            let table_start = Instant::now();

            if let Some(schema) = &table.schema {
                if !ensured_schemas.contains(schema) {
                    let ensured = sink.ensure_schema(schema).await;
                    self.ensure_ok(&name, ensured)?;
                    ensured_schemas.insert(schema.clone());
                }
            }
            let ensured = sink.ensure_table(table).await;
            self.ensure_ok(&name, ensured)?;
            self.advance(&name, TableState::SchemaEnsured);

            let count = counts.for_table(&name);
            let parents = self.parent_ranges(table, count)?;
            let batch = self
                .rows
                .generate(table, count, &parents)
                .map_err(|source| LoadError::Generation {
                    table: name.clone(),
                    source,
                })?;
            self.advance(&name, TableState::RowsGenerated);

            let range = match sink.insert_batch(table, batch).await {
                Ok(range) => range,
                Err(cause) => {
                    self.advance(&name, TableState::InsertFailed);
                    warn!(event = "insert_failed", table = %name, error = %cause);
                    return Err(LoadError::InsertFailed { table: name, cause });
                }
            };
            self.advance(&name, TableState::Inserted);

            if let Some(range) = range {
                self.ranges.insert(name.clone(), range);
            }
            self.advance(&name, TableState::RangeRecorded);

            info!(
                event = "table_seeded",
                table = %name,
                rows = count,
                min = range.map(|r| r.min()),
                max = range.map(|r| r.max()),
                duration_ms = table_start.elapsed().as_millis() as u64
            );

            tables.push(TableReport {
                table: name,
                rows_requested: count,
                rows_inserted: range.map_or(0, |r| r.len()),
                range,
            });
        }

        let report = SeedReport {
            run_id,
            tables,
            ranges: self.ranges.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            event = "seed_finished",
            run_id = %report.run_id,
            rows = report.rows_inserted(),
            duration_ms = report.duration_ms
        );

        Ok(report)
    }

    fn ensure_ok(&mut self, table: &str, result: Result<(), SinkError>) -> Result<(), LoadError> {
        result.map_err(|cause| {
            self.advance(table, TableState::SchemaEnsureFailed);
            warn!(event = "ensure_failed", table = %table, error = %cause);
            LoadError::SchemaEnsureFailed {
                table: table.to_string(),
                cause,
            }
        })
    }

    /// Recorded ranges of `table`'s parents. A parent that was seeded with no
    /// rows cannot back a non-empty child.
    fn parent_ranges(&self, table: &TableSpec, count: usize) -> Result<ParentRanges, LoadError> {
        let mut parents = ParentRanges::new();
        for parent in table.parents() {
            match self.ranges.get(parent) {
                Some(range) => {
                    parents.insert(parent.to_string(), *range);
                }
                None if count > 0 && self.state(parent) == Some(TableState::RangeRecorded) => {
                    return Err(LoadError::Generation {
                        table: table.qualified_name(),
                        source: GenerationError::EmptyParent {
                            table: table.qualified_name(),
                            parent: parent.to_string(),
                        },
                    });
                }
                None => {}
            }
        }
        Ok(parents)
    }

    fn advance(&mut self, table: &str, state: TableState) {
        debug!(event = "table_state", table = %table, state = ?state);
        self.states.insert(table.to_string(), state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_default() {
        let counts = RowCounts::uniform(10).with_override("orders.products", 3);
        assert_eq!(counts.for_table("orders.products"), 3);
        assert_eq!(counts.for_table("orders.orders"), 10);
    }

    fn report(rows: &[(&str, u64)]) -> SeedReport {
        SeedReport {
            run_id: "run".to_string(),
            tables: rows
                .iter()
                .map(|(table, inserted)| TableReport {
                    table: table.to_string(),
                    rows_requested: *inserted as usize,
                    rows_inserted: *inserted,
                    range: IdentifierRange::positional(*inserted),
                })
                .collect(),
            ranges: BTreeMap::new(),
            duration_ms: 0,
        }
    }

    #[test]
    fn summary_for_uniform_counts() {
        let report = report(&[("orders.orders", 5), ("orders.order_details", 5)]);
        assert_eq!(
            report.summary(),
            "Inserted 5 rows into 'orders.orders', 'orders.order_details' tables."
        );
    }

    #[test]
    fn summary_without_tables() {
        assert_eq!(report(&[]).summary(), "Inserted 0 rows; no tables were seeded.");
    }

    #[test]
    fn summary_for_mixed_counts() {
        let report = report(&[("returns.returns", 10), ("returns.customer_feedback", 4)]);
        assert_eq!(
            report.summary(),
            "Inserted 14 rows into 'returns.returns' (10), 'returns.customer_feedback' (4) tables."
        );
    }
}

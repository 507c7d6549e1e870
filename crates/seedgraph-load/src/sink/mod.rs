mod memory;
mod postgres;

pub use memory::MemorySink;
pub use postgres::{DEFAULT_BATCH_SIZE, PostgresSink, create_schema_sql, create_table_sql};

use async_trait::async_trait;

use seedgraph_core::{IdentifierRange, RowBatch, TableSpec};

use crate::errors::SinkError;

/// Relational store that accepts idempotent DDL and batched inserts.
#[async_trait]
pub trait Sink: Send {
    /// Engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Create the namespace if it does not exist.
    async fn ensure_schema(&mut self, name: &str) -> Result<(), SinkError>;

    /// Create the table if it does not exist. Existing data is left untouched.
    async fn ensure_table(&mut self, table: &TableSpec) -> Result<(), SinkError>;

    /// Insert all rows of `batch` as one unit of work.
    ///
    /// Returns the range of keys the sink assigned, the positional range
    /// `[1, n]` for tables without a generated key, or `None` for an empty batch.
    async fn insert_batch(
        &mut self,
        table: &TableSpec,
        batch: RowBatch,
    ) -> Result<Option<IdentifierRange>, SinkError>;

    /// Release the underlying connection.
    async fn close(&mut self) -> Result<(), SinkError>;
}

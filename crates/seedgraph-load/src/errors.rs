use thiserror::Error;

use seedgraph_core::SchemaError;
use seedgraph_generate::GenerationError;

/// Failures reported by a sink adapter.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    /// The sink assigned keys with gaps, so no single range describes them.
    #[error("keys assigned to '{table}' are not contiguous")]
    NonContiguousKeys { table: String },
    #[error("sink connection is closed")]
    Closed,
    /// The sink refused the operation.
    #[error("{0}")]
    Rejected(String),
}

/// Errors that abort a seeding run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("generating rows for '{table}' failed: {source}")]
    Generation {
        table: String,
        source: GenerationError,
    },
    #[error("ensuring '{table}' failed: {cause}")]
    SchemaEnsureFailed {
        table: String,
        #[source]
        cause: SinkError,
    },
    #[error("inserting into '{table}' failed: {cause}")]
    InsertFailed {
        table: String,
        #[source]
        cause: SinkError,
    },
    #[error("closing sink failed: {0}")]
    Close(#[source] SinkError),
}

impl LoadError {
    /// Table the failure is attributed to, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            LoadError::Generation { table, .. }
            | LoadError::SchemaEnsureFailed { table, .. }
            | LoadError::InsertFailed { table, .. } => Some(table),
            _ => None,
        }
    }
}

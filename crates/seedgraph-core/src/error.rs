use thiserror::Error;

/// Schema graph errors, all raised before any sink I/O.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A table with the same qualified name is already registered.
    #[error("table '{0}' is already registered")]
    DuplicateTable(String),
    /// A foreign key points at a table that has not been registered.
    #[error("table '{table}' references unregistered parent '{parent}'")]
    UnknownParent { table: String, parent: String },
    /// The foreign key graph contains a cycle.
    #[error("foreign key graph contains a cycle through: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),
    /// A foreign key names a column that does not exist.
    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },
    /// A column declaration is inconsistent.
    #[error("invalid column '{table}.{column}': {reason}")]
    InvalidColumn {
        table: String,
        column: String,
        reason: String,
    },
}

/// Convenience alias for schema results.
pub type Result<T> = std::result::Result<T, SchemaError>;

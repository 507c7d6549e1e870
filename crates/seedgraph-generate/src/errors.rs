use thiserror::Error;

use seedgraph_core::SemanticType;

/// Errors emitted while generating rows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// A parent has no recorded range; the tables were not visited in dependency order.
    #[error("table '{table}' references '{parent}' which has no recorded identifier range")]
    MissingParentRange { table: String, parent: String },
    /// A parent was seeded with zero rows, so child rows have nothing to reference.
    #[error("table '{table}' needs rows from '{parent}' but it was seeded with no rows")]
    EmptyParent { table: String, parent: String },
    /// The field generator cannot satisfy the requested type and constraint.
    #[error("cannot generate {semantic:?}: {reason}")]
    Unsupported {
        semantic: SemanticType,
        reason: String,
    },
}

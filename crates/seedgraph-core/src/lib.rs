//! Core contracts for seedgraph.
//!
//! This crate defines the schema graph model, the registry that validates and
//! orders it, and the value types shared by the row generator and the loader.

pub mod batch;
pub mod connection;
pub mod error;
pub mod range;
pub mod registry;
pub mod schema;
pub mod types;

pub use batch::{GeneratedValue, RowBatch};
pub use connection::{ConnectionConfig, RedactedConnection};
pub use error::{Result, SchemaError};
pub use range::IdentifierRange;
pub use registry::{SchemaGraph, SchemaRegistry};
pub use schema::{ColumnSpec, ForeignKeyRef, TableSpec};
pub use types::{SemanticType, StorageClass, ValueConstraint};

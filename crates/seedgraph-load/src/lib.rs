//! Dependency-ordered loading of synthetic rows into a relational sink.
//!
//! The [`Loader`] walks a schema graph parent-first, ensures each table exists,
//! generates its rows and records the identifier range the sink assigned so
//! child tables only reference keys that are already committed.

pub mod catalog;
pub mod errors;
pub mod loader;
pub mod sink;

pub use catalog::Catalog;
pub use errors::{LoadError, SinkError};
pub use loader::{Loader, RowCounts, SeedReport, TableReport, TableState};
pub use sink::{MemorySink, PostgresSink, Sink};

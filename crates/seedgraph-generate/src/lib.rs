//! Synthetic value and row generation for seedgraph.
//!
//! Field values come from a [`FieldGenerator`]; foreign keys are drawn by the
//! [`RowGenerator`] from the recorded identifier ranges of parent tables.

pub mod errors;
pub mod field;
pub mod rows;

pub use errors::GenerationError;
pub use field::{FakeFieldGenerator, FieldGenerator};
pub use rows::{ParentRanges, RowGenerator};

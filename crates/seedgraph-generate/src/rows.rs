use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use seedgraph_core::{ColumnSpec, GeneratedValue, IdentifierRange, RowBatch, TableSpec};

use crate::errors::GenerationError;
use crate::field::FieldGenerator;

/// Recorded identifier ranges keyed by qualified table name.
pub type ParentRanges = BTreeMap<String, IdentifierRange>;

/// Builds row batches for tables, drawing foreign keys from parent ranges.
#[derive(Debug)]
pub struct RowGenerator<F> {
    fields: F,
    rng: ChaCha8Rng,
}

enum ColumnSource<'a> {
    Reference(IdentifierRange),
    Field(&'a ColumnSpec),
}

impl<F: FieldGenerator> RowGenerator<F> {
    /// Generator seeded from OS entropy.
    pub fn new(fields: F) -> Self {
        Self {
            fields,
            rng: ChaCha8Rng::from_os_rng(),
        }
    }

    /// Generator with a fixed seed, for repeatable output.
    pub fn seeded(fields: F, seed: u64) -> Self {
        Self {
            fields,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generate `count` rows for `table`.
    ///
    /// The identifier column is omitted. Foreign-key columns are drawn
    /// uniformly from the parent's inclusive range in `parent_ranges`; a
    /// missing parent range is an ordering bug and fails the call.
    pub fn generate(
        &mut self,
        table: &TableSpec,
        count: usize,
        parent_ranges: &ParentRanges,
    ) -> Result<RowBatch, GenerationError> {
        let table_name = table.qualified_name();
        let columns: Vec<String> = table.insert_columns().map(|c| c.name.clone()).collect();

        if count == 0 {
            return Ok(RowBatch::new(table_name, columns));
        }

        let sources = table
            .insert_columns()
            .map(|column| match table.foreign_key_for(&column.name) {
                Some(fk) => parent_ranges
                    .get(&fk.parent)
                    .copied()
                    .map(ColumnSource::Reference)
                    .ok_or_else(|| GenerationError::MissingParentRange {
                        table: table_name.clone(),
                        parent: fk.parent.clone(),
                    }),
                None => Ok(ColumnSource::Field(column)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut batch = RowBatch::with_capacity(table_name, columns, count);
        for _ in 0..count {
            let mut row = Vec::with_capacity(sources.len());
            for source in &sources {
                let value = match source {
                    ColumnSource::Reference(range) => {
                        GeneratedValue::Int(self.rng.random_range(range.min()..=range.max()))
                    }
                    ColumnSource::Field(column) => self.fields.generate(
                        column.semantic,
                        column.constraint.as_ref(),
                        &mut self.rng,
                    )?,
                };
                row.push(value);
            }
            batch.push(row);
        }

        debug!(table = %batch.table(), rows = batch.len(), "rows generated");
        Ok(batch)
    }
}

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SchemaError};
use crate::schema::{ForeignKeyRef, TableSpec};
use crate::types::{SemanticType, ValueConstraint};

/// The registered tables and their foreign-key edges.
pub type SchemaGraph = SchemaRegistry;

/// Registry of table specs forming an acyclic dependency graph.
///
/// Tables are keyed by qualified name and kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: Vec<TableSpec>,
    index: BTreeMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from tables listed in any order.
    pub fn from_tables(tables: impl IntoIterator<Item = TableSpec>) -> Result<Self> {
        let mut registry = Self::new();
        registry.register_all(tables)?;
        Ok(registry)
    }

    /// Register a single table. Every parent must already be registered.
    pub fn register(&mut self, table: TableSpec) -> Result<()> {
        let key = table.qualified_name();
        if self.index.contains_key(&key) {
            return Err(SchemaError::DuplicateTable(key));
        }
        validate_columns(&table)?;

        for fk in &table.foreign_keys {
            let parent = self
                .get(&fk.parent)
                .ok_or_else(|| SchemaError::UnknownParent {
                    table: key.clone(),
                    parent: fk.parent.clone(),
                })?;
            check_parent_column(&key, fk, parent)?;
        }

        self.insert(key, table);
        Ok(())
    }

    /// Register a group of tables whose parents may appear later in the list.
    ///
    /// The group is validated as a whole; on error nothing is registered.
    pub fn register_all(&mut self, tables: impl IntoIterator<Item = TableSpec>) -> Result<()> {
        let tables: Vec<TableSpec> = tables.into_iter().collect();
        let mut pending: BTreeMap<String, usize> = BTreeMap::new();

        for (idx, table) in tables.iter().enumerate() {
            let key = table.qualified_name();
            if self.index.contains_key(&key) || pending.insert(key.clone(), idx).is_some() {
                return Err(SchemaError::DuplicateTable(key));
            }
            validate_columns(table)?;
        }

        for table in &tables {
            for fk in &table.foreign_keys {
                let parent = match pending.get(&fk.parent) {
                    Some(&idx) => &tables[idx],
                    None => self
                        .get(&fk.parent)
                        .ok_or_else(|| SchemaError::UnknownParent {
                            table: table.qualified_name(),
                            parent: fk.parent.clone(),
                        })?,
                };
                check_parent_column(&table.qualified_name(), fk, parent)?;
            }
        }

        let refs: Vec<&TableSpec> = tables.iter().collect();
        let order = toposort(&refs).map_err(SchemaError::CyclicDependency)?;

        let mut slots: Vec<Option<TableSpec>> = tables.into_iter().map(Some).collect();
        for idx in order {
            if let Some(table) = slots[idx].take() {
                let key = table.qualified_name();
                self.insert(key, table);
            }
        }

        Ok(())
    }

    /// Tables ordered so that every parent precedes its children.
    ///
    /// Ties keep registration order.
    pub fn topological_order(&self) -> Result<Vec<&TableSpec>> {
        let refs: Vec<&TableSpec> = self.tables.iter().collect();
        let order = toposort(&refs).map_err(SchemaError::CyclicDependency)?;
        Ok(order.into_iter().map(|idx| &self.tables[idx]).collect())
    }

    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.index.get(name).map(|&idx| &self.tables[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables holding at least one foreign key into `name`.
    pub fn children_of(&self, name: &str) -> Vec<&TableSpec> {
        self.tables
            .iter()
            .filter(|table| table.parents().contains(name))
            .collect()
    }

    /// Whether any registered table references `name`.
    pub fn is_referenced(&self, name: &str) -> bool {
        self.tables
            .iter()
            .any(|table| table.parents().contains(name))
    }

    fn insert(&mut self, key: String, table: TableSpec) {
        self.index.insert(key, self.tables.len());
        self.tables.push(table);
    }
}

fn validate_columns(table: &TableSpec) -> Result<()> {
    let key = table.qualified_name();
    let invalid = |column: &str, reason: String| SchemaError::InvalidColumn {
        table: key.clone(),
        column: column.to_string(),
        reason,
    };

    let mut names = BTreeSet::new();
    let mut identifiers = 0;
    for column in &table.columns {
        if !names.insert(column.name.as_str()) {
            return Err(invalid(&column.name, "duplicate column name".to_string()));
        }
        if column.is_identifier() {
            identifiers += 1;
            if identifiers > 1 {
                return Err(invalid(
                    &column.name,
                    "only one identifier column is allowed".to_string(),
                ));
            }
        }

        match &column.constraint {
            Some(constraint) => {
                if !column.semantic.accepts(constraint) {
                    return Err(invalid(
                        &column.name,
                        format!("constraint does not apply to {:?}", column.semantic),
                    ));
                }
                if let Some(problem) = constraint.problem() {
                    return Err(invalid(&column.name, problem));
                }
            }
            None if column.semantic == SemanticType::Enumerated => {
                return Err(invalid(
                    &column.name,
                    "enumerated column requires one_of choices".to_string(),
                ));
            }
            None => {}
        }
    }

    let mut fk_columns = BTreeSet::new();
    for fk in &table.foreign_keys {
        let column = table
            .column_named(&fk.column)
            .ok_or_else(|| SchemaError::UnknownColumn {
                table: key.clone(),
                column: fk.column.clone(),
            })?;
        if column.semantic != SemanticType::Integer {
            return Err(invalid(
                &fk.column,
                "foreign key column must be an integer".to_string(),
            ));
        }
        if matches!(column.constraint, Some(ValueConstraint::IntRange { .. })) {
            return Err(invalid(
                &fk.column,
                "foreign key column takes its range from the parent".to_string(),
            ));
        }
        if !fk_columns.insert(fk.column.as_str()) {
            return Err(invalid(
                &fk.column,
                "column has more than one foreign key".to_string(),
            ));
        }
    }

    Ok(())
}

/// Children draw keys from the parent's identifier range, so a reference must
/// target that column. A parent without one only backs soft references, whose
/// values are row positions.
fn check_parent_column(child: &str, fk: &ForeignKeyRef, parent: &TableSpec) -> Result<()> {
    if parent.column_named(&fk.parent_column).is_none() {
        return Err(SchemaError::UnknownColumn {
            table: parent.qualified_name(),
            column: fk.parent_column.clone(),
        });
    }

    let reason = match parent.identifier_column() {
        Some(id) if id.name != fk.parent_column => format!(
            "foreign key must reference '{}.{}', the parent identifier",
            parent.qualified_name(),
            id.name
        ),
        None if fk.enforced => format!(
            "'{}' has no identifier column; only a soft reference can target it",
            parent.qualified_name()
        ),
        _ => return Ok(()),
    };
    Err(SchemaError::InvalidColumn {
        table: child.to_string(),
        column: fk.column.clone(),
        reason,
    })
}

/// Kahn's algorithm over table indices. Parents outside `tables` are treated
/// as satisfied. On failure returns the names still waiting on a parent.
fn toposort(tables: &[&TableSpec]) -> std::result::Result<Vec<usize>, Vec<String>> {
    let index: BTreeMap<String, usize> = tables
        .iter()
        .enumerate()
        .map(|(idx, table)| (table.qualified_name(), idx))
        .collect();

    let mut children: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    let mut indegree = vec![0_usize; tables.len()];

    for (idx, table) in tables.iter().enumerate() {
        for parent in table.parents() {
            if let Some(&parent_idx) = index.get(parent) {
                if children.entry(parent_idx).or_default().insert(idx) {
                    indegree[idx] += 1;
                }
            }
        }
    }

    let mut ready: BTreeSet<usize> = indegree
        .iter()
        .enumerate()
        .filter_map(|(idx, count)| (*count == 0).then_some(idx))
        .collect();

    let mut order = Vec::with_capacity(tables.len());
    while let Some(node) = ready.pop_first() {
        order.push(node);

        if let Some(targets) = children.get(&node) {
            for &target in targets {
                indegree[target] = indegree[target].saturating_sub(1);
                if indegree[target] == 0 {
                    ready.insert(target);
                }
            }
        }
    }

    if order.len() == tables.len() {
        Ok(order)
    } else {
        Err(indegree
            .iter()
            .enumerate()
            .filter_map(|(idx, count)| (*count > 0).then(|| tables[idx].qualified_name()))
            .collect())
    }
}

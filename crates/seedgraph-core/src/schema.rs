use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{SemanticType, ValueConstraint};

/// A table node in the schema graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Namespace the table lives in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
    /// Columns in insert order.
    pub columns: Vec<ColumnSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKeyRef>,
}

/// Column declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub semantic: SemanticType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<ValueConstraint>,
    #[serde(default)]
    pub nullable: bool,
}

/// Foreign-key edge from a child column to a parent table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Column on the child table.
    pub column: String,
    /// Qualified name of the parent table.
    pub parent: String,
    /// Referenced column on the parent table.
    pub parent_column: String,
    /// Emit a `REFERENCES` clause. Soft references only borrow the parent's range.
    #[serde(default = "default_enforced")]
    pub enforced: bool,
}

fn default_enforced() -> bool {
    true
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn in_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            ..Self::new(name)
        }
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Declare an enforced foreign key. The parent is named by qualified name.
    pub fn foreign_key(
        mut self,
        column: impl Into<String>,
        parent: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(ForeignKeyRef {
            column: column.into(),
            parent: parent.into(),
            parent_column: parent_column.into(),
            enforced: true,
        });
        self
    }

    /// Declare a reference whose values come from the parent range but which
    /// the sink does not enforce.
    pub fn soft_foreign_key(
        mut self,
        column: impl Into<String>,
        parent: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(ForeignKeyRef {
            column: column.into(),
            parent: parent.into(),
            parent_column: parent_column.into(),
            enforced: false,
        });
        self
    }

    /// `schema.table`, or the bare name when no namespace is set.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn identifier_column(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.is_identifier())
    }

    pub fn column_named(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKeyRef> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    /// Columns the caller supplies values for (everything except the generated key).
    pub fn insert_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|column| !column.is_identifier())
    }

    /// Qualified names of the parent tables, deduplicated.
    pub fn parents(&self) -> BTreeSet<&str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.parent.as_str())
            .collect()
    }
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, semantic: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic,
            constraint: None,
            nullable: false,
        }
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::new(name, SemanticType::Identifier)
    }

    pub fn with_constraint(mut self, constraint: ValueConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn is_identifier(&self) -> bool {
        self.semantic == SemanticType::Identifier
    }

    pub fn max_length(&self) -> Option<usize> {
        match self.constraint {
            Some(ValueConstraint::MaxLength { max }) => Some(max),
            _ => None,
        }
    }
}

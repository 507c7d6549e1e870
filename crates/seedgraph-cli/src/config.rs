use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use seedgraph_core::{ConnectionConfig, SchemaError, SchemaRegistry, TableSpec};
use seedgraph_load::Catalog;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("schema file {path} is invalid: {source}")]
    Schema { path: PathBuf, source: SchemaError },
}

/// Settings file for a seeding run. Command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub connection: ConnectionConfig,
    pub catalog: Option<Catalog>,
    pub schema_file: Option<PathBuf>,
    pub seed: Option<u64>,
    pub batch_size: Option<usize>,
    /// Per-table row counts, keyed by qualified table name.
    pub rows: BTreeMap<String, usize>,
}

impl SeedConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read(path)?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A user-supplied schema: `[[tables]]` entries in any order.
#[derive(Debug, Deserialize)]
struct SchemaFile {
    tables: Vec<TableSpec>,
}

pub fn load_schema_file(path: &Path) -> Result<SchemaRegistry, ConfigError> {
    let content = read(path)?;
    let file: SchemaFile = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut graph = SchemaRegistry::new();
    graph
        .register_all(file.tables)
        .map_err(|source| ConfigError::Schema {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(graph)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: SeedConfig = toml::from_str("").unwrap();
        assert_eq!(config, SeedConfig::default());
        assert_eq!(config.connection.port, 5432);
        assert_eq!(config.connection.dbname, "postgres");
    }

    #[test]
    fn parses_full_settings() {
        let config: SeedConfig = toml::from_str(
            r#"
            catalog = "commerce"
            seed = 7
            batch_size = 250

            [connection]
            dbname = "shop"
            host = "db.internal"

            [rows]
            "orders.products" = 40
            "#,
        )
        .unwrap();

        assert_eq!(config.catalog, Some(Catalog::Commerce));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.batch_size, Some(250));
        assert_eq!(config.connection.dbname, "shop");
        assert_eq!(config.connection.host, "db.internal");
        assert_eq!(config.connection.user, "user");
        assert_eq!(config.rows.get("orders.products"), Some(&40));
    }

    #[test]
    fn schema_file_tables_may_be_listed_child_first() {
        let dir = std::env::temp_dir().join(format!("seedgraph-schema-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("schema.toml");
        std::fs::write(
            &path,
            r#"
            [[tables]]
            name = "line_items"
            columns = [
              { name = "id", semantic = "identifier" },
              { name = "invoice_id", semantic = "integer" },
            ]
            foreign_keys = [
              { column = "invoice_id", parent = "invoices", parent_column = "id" },
            ]

            [[tables]]
            name = "invoices"
            columns = [
              { name = "id", semantic = "identifier" },
              { name = "customer", semantic = "full_name" },
            ]
            "#,
        )
        .unwrap();

        let graph = load_schema_file(&path).unwrap();
        let order: Vec<String> = graph
            .topological_order()
            .unwrap()
            .into_iter()
            .map(TableSpec::qualified_name)
            .collect();
        assert_eq!(order, vec!["invoices", "line_items"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SeedConfig::load(Path::new("/nonexistent/seedgraph.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/seedgraph.toml"));
    }
}

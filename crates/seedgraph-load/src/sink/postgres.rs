use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::query_builder::Separated;
use sqlx::{ConnectOptions, Connection, Postgres, QueryBuilder};
use tracing::{debug, info};

use seedgraph_core::{
    ColumnSpec, ConnectionConfig, GeneratedValue, IdentifierRange, RowBatch, StorageClass,
    TableSpec, ValueConstraint,
};

use super::Sink;
use crate::errors::SinkError;

/// Default number of rows per INSERT statement.
pub const DEFAULT_BATCH_SIZE: usize = 500;

const MAX_BIND_PARAMS: usize = 65_535;
const DEFAULT_VARCHAR_LEN: usize = 255;
const DECIMAL_PRECISION: u32 = 10;
const DEFAULT_DECIMAL_SCALE: u32 = 2;

/// Sink writing to PostgreSQL over a single exclusively-owned connection.
#[derive(Debug)]
pub struct PostgresSink {
    conn: Option<PgConnection>,
    batch_size: usize,
}

impl PostgresSink {
    /// Connect using static connection parameters.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, SinkError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.dbname);
        info!(event = "sink_connecting", connection = %config.redacted());
        Self::connect_with(options).await
    }

    /// Connect with pre-built options (e.g. parsed from a URL).
    pub async fn connect_with(options: PgConnectOptions) -> Result<Self, SinkError> {
        let conn = options.connect().await?;
        Ok(Self {
            conn: Some(conn),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Rows per INSERT statement. All statements for a table still share one transaction.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn conn(&mut self) -> Result<&mut PgConnection, SinkError> {
        self.conn.as_mut().ok_or(SinkError::Closed)
    }
}

#[async_trait]
impl Sink for PostgresSink {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn ensure_schema(&mut self, name: &str) -> Result<(), SinkError> {
        let sql = create_schema_sql(name);
        debug!(event = "ddl", sql = %sql);
        sqlx::query(&sql).execute(self.conn()?).await?;
        Ok(())
    }

    async fn ensure_table(&mut self, table: &TableSpec) -> Result<(), SinkError> {
        let sql = create_table_sql(table);
        debug!(event = "ddl", sql = %sql);
        sqlx::query(&sql).execute(self.conn()?).await?;
        Ok(())
    }

    async fn insert_batch(
        &mut self,
        table: &TableSpec,
        batch: RowBatch,
    ) -> Result<Option<IdentifierRange>, SinkError> {
        if batch.is_empty() {
            return Ok(None);
        }

        let name = table.qualified_name();
        let columns: Vec<&ColumnSpec> = table.insert_columns().collect();
        let identifier = table.identifier_column();
        let rows = batch.into_rows();
        let row_count = rows.len();
        let chunk_size = self
            .batch_size
            .min(MAX_BIND_PARAMS / columns.len().max(1))
            .max(1);

        let conn = self.conn()?;
        let mut tx = conn.begin().await?;
        let mut keys: Vec<i64> = Vec::with_capacity(row_count);

        if columns.is_empty() {
            let sql = insert_default_values_sql(table);
            for _ in 0..row_count {
                match identifier {
                    Some(_) => {
                        let key = sqlx::query_scalar::<_, i32>(&sql).fetch_one(&mut *tx).await?;
                        keys.push(i64::from(key));
                    }
                    None => {
                        sqlx::query(&sql).execute(&mut *tx).await?;
                    }
                }
            }
        } else {
            for chunk in rows.chunks(chunk_size) {
                let mut builder: QueryBuilder<Postgres> =
                    QueryBuilder::new(insert_prefix_sql(table, &columns));
                builder.push_values(chunk, |mut tuple, row| {
                    for (column, value) in columns.iter().zip(row) {
                        push_value(&mut tuple, column, value);
                    }
                });

                match identifier {
                    Some(id) => {
                        builder.push(" RETURNING ");
                        builder.push(quote_ident(&id.name));
                        let assigned: Vec<i32> = builder
                            .build_query_scalar::<i32>()
                            .fetch_all(&mut *tx)
                            .await?;
                        keys.extend(assigned.into_iter().map(i64::from));
                    }
                    None => {
                        builder.build().execute(&mut *tx).await?;
                    }
                }
                debug!(table = %name, rows = chunk.len(), "insert statement executed");
            }
        }

        let range = match identifier {
            Some(_) => match IdentifierRange::from_contiguous(&keys) {
                Some(range) if range.len() == row_count as u64 => range,
                _ => {
                    tx.rollback().await?;
                    return Err(SinkError::NonContiguousKeys { table: name });
                }
            },
            None => IdentifierRange::positional(row_count as u64)
                .ok_or_else(|| SinkError::Rejected(format!("row count overflow for '{name}'")))?,
        };

        tx.commit().await?;
        Ok(Some(range))
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            info!(event = "sink_closed");
        }
        Ok(())
    }
}

/// `CREATE SCHEMA IF NOT EXISTS` statement for a namespace.
pub fn create_schema_sql(name: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(name))
}

/// `CREATE TABLE IF NOT EXISTS` statement derived from a table spec.
pub fn create_table_sql(table: &TableSpec) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            let mut definition = format!("{} {}", quote_ident(&column.name), column_type(column));
            if !column.is_identifier() && !column.nullable {
                definition.push_str(" NOT NULL");
            }
            if let Some(fk) = table.foreign_key_for(&column.name).filter(|fk| fk.enforced) {
                definition.push_str(&format!(
                    " REFERENCES {}({})",
                    quote_qualified(&fk.parent),
                    quote_ident(&fk.parent_column)
                ));
            }
            definition
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        table_ident(table),
        columns.join(",\n    ")
    )
}

fn column_type(column: &ColumnSpec) -> String {
    match column.semantic.storage_class() {
        StorageClass::Identifier => "SERIAL PRIMARY KEY".to_string(),
        StorageClass::ShortText => format!(
            "VARCHAR({})",
            column.max_length().unwrap_or(DEFAULT_VARCHAR_LEN)
        ),
        StorageClass::Enumerated => {
            let longest = match &column.constraint {
                Some(ValueConstraint::OneOf { values }) => {
                    values.iter().map(|v| v.chars().count()).max().unwrap_or(0)
                }
                _ => 0,
            };
            format!("VARCHAR({})", longest.max(DEFAULT_VARCHAR_LEN))
        }
        StorageClass::LongText => "TEXT".to_string(),
        StorageClass::Integer => match column.constraint {
            Some(ValueConstraint::IntRange { min, max })
                if min < i64::from(i32::MIN) || max > i64::from(i32::MAX) =>
            {
                "BIGINT".to_string()
            }
            _ => "INT".to_string(),
        },
        StorageClass::Decimal => {
            let (precision, scale) = match column.constraint {
                Some(ValueConstraint::DecimalRange { min, max, scale }) => {
                    (integer_digits(min.abs().max(max.abs())) + scale, scale)
                }
                _ => (DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE),
            };
            format!("DECIMAL({}, {scale})", precision.max(DECIMAL_PRECISION))
        }
        StorageClass::Boolean => "BOOLEAN".to_string(),
        StorageClass::Timestamp => "TIMESTAMP WITH TIME ZONE".to_string(),
    }
}

/// Digits left of the point needed to hold `bound` once rounded up.
fn integer_digits(bound: f64) -> u32 {
    let whole = bound.ceil();
    if whole < 10.0 {
        1
    } else {
        format!("{whole:.0}").len() as u32
    }
}

fn insert_prefix_sql(table: &TableSpec, columns: &[&ColumnSpec]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    format!("INSERT INTO {} ({}) ", table_ident(table), names.join(", "))
}

fn insert_default_values_sql(table: &TableSpec) -> String {
    match table.identifier_column() {
        Some(id) => format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            table_ident(table),
            quote_ident(&id.name)
        ),
        None => format!("INSERT INTO {} DEFAULT VALUES", table_ident(table)),
    }
}

fn push_value(
    tuple: &mut Separated<'_, '_, Postgres, &'static str>,
    column: &ColumnSpec,
    value: &GeneratedValue,
) {
    match value {
        GeneratedValue::Null => match column.semantic.storage_class() {
            StorageClass::Integer | StorageClass::Identifier => {
                tuple.push_bind(None::<i64>);
            }
            StorageClass::Decimal => {
                tuple.push_bind(None::<Decimal>);
            }
            StorageClass::Boolean => {
                tuple.push_bind(None::<bool>);
            }
            StorageClass::Timestamp => {
                tuple.push_bind(None::<DateTime<Utc>>);
            }
            StorageClass::ShortText | StorageClass::LongText | StorageClass::Enumerated => {
                tuple.push_bind(None::<String>);
            }
        },
        GeneratedValue::Bool(value) => {
            tuple.push_bind(*value);
        }
        GeneratedValue::Int(value) => {
            tuple.push_bind(*value);
        }
        GeneratedValue::Decimal(value) => {
            tuple.push_bind(*value);
        }
        GeneratedValue::Text(value) => {
            tuple.push_bind(value.clone());
        }
        GeneratedValue::Timestamp(value) => {
            tuple.push_bind(*value);
        }
    }
}

fn table_ident(table: &TableSpec) -> String {
    match &table.schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&table.name)),
        None => quote_ident(&table.name),
    }
}

fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedgraph_core::SemanticType;

    fn order_details() -> TableSpec {
        TableSpec::in_schema("orders", "order_details")
            .column(ColumnSpec::identifier("order_detail_id"))
            .column(ColumnSpec::new("order_id", SemanticType::Integer).nullable())
            .column(ColumnSpec::new("quantity", SemanticType::Integer))
            .column(
                ColumnSpec::new("price_per_unit", SemanticType::Decimal).with_constraint(
                    ValueConstraint::DecimalRange {
                        min: 0.0,
                        max: 999.99,
                        scale: 2,
                    },
                ),
            )
            .foreign_key("order_id", "orders.orders", "order_id")
    }

    #[test]
    fn create_table_is_idempotent_ddl() {
        let sql = create_table_sql(&order_details());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"orders\".\"order_details\""));
        assert!(sql.contains("\"order_detail_id\" SERIAL PRIMARY KEY"));
        assert!(sql.contains(
            "\"order_id\" INT REFERENCES \"orders\".\"orders\"(\"order_id\")"
        ));
        assert!(sql.contains("\"quantity\" INT NOT NULL"));
        assert!(sql.contains("\"price_per_unit\" DECIMAL(10, 2) NOT NULL"));
    }

    #[test]
    fn soft_references_emit_no_constraint() {
        let table = TableSpec::in_schema("returns", "returns")
            .column(ColumnSpec::identifier("return_id"))
            .column(ColumnSpec::new("order_id", SemanticType::Integer))
            .soft_foreign_key("order_id", "orders.orders", "order_id");
        let sql = create_table_sql(&table);
        assert!(sql.contains("\"order_id\" INT NOT NULL"));
        assert!(!sql.contains("REFERENCES"));
    }

    #[test]
    fn text_lengths_follow_constraints() {
        let table = TableSpec::new("orders")
            .column(
                ColumnSpec::new("first_name", SemanticType::FirstName)
                    .with_constraint(ValueConstraint::MaxLength { max: 100 }),
            )
            .column(ColumnSpec::new("reason", SemanticType::Sentence).nullable())
            .column(
                ColumnSpec::new("status", SemanticType::Enumerated)
                    .with_constraint(ValueConstraint::one_of(["Pending"])),
            );
        let sql = create_table_sql(&table);
        assert!(sql.contains("\"first_name\" VARCHAR(100) NOT NULL"));
        assert!(sql.contains("\"reason\" TEXT,"));
        assert!(sql.contains("\"status\" VARCHAR(255) NOT NULL"));
    }

    #[test]
    fn schema_ddl_quotes_names() {
        assert_eq!(
            create_schema_sql("returns"),
            "CREATE SCHEMA IF NOT EXISTS \"returns\""
        );
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn insert_prefix_lists_non_identifier_columns() {
        let table = order_details();
        let columns: Vec<&ColumnSpec> = table.insert_columns().collect();
        assert_eq!(
            insert_prefix_sql(&table, &columns),
            "INSERT INTO \"orders\".\"order_details\" (\"order_id\", \"quantity\", \"price_per_unit\") "
        );
    }

    #[test]
    fn wide_int_ranges_use_bigint() {
        let table = TableSpec::new("ledger")
            .column(
                ColumnSpec::new("big", SemanticType::Integer)
                    .with_constraint(ValueConstraint::IntRange { min: 0, max: 5_000_000_000 }),
            )
            .column(
                ColumnSpec::new("small", SemanticType::Integer)
                    .with_constraint(ValueConstraint::IntRange { min: -5, max: 99 }),
            )
            .column(
                ColumnSpec::new("debt", SemanticType::Integer).with_constraint(
                    ValueConstraint::IntRange {
                        min: i64::from(i32::MIN) - 1,
                        max: 0,
                    },
                ),
            );
        let sql = create_table_sql(&table);
        assert!(sql.contains("\"big\" BIGINT NOT NULL"));
        assert!(sql.contains("\"small\" INT NOT NULL"));
        assert!(sql.contains("\"debt\" BIGINT NOT NULL"));
    }

    #[test]
    fn decimal_precision_covers_declared_max() {
        let table = TableSpec::new("ledger")
            .column(ColumnSpec::new("amount", SemanticType::Decimal).with_constraint(
                ValueConstraint::DecimalRange {
                    min: 0.0,
                    max: 1e12,
                    scale: 2,
                },
            ))
            .column(ColumnSpec::new("refund", SemanticType::Decimal).with_constraint(
                ValueConstraint::DecimalRange {
                    min: -123_456_789.5,
                    max: 0.0,
                    scale: 4,
                },
            ))
            .column(ColumnSpec::new("fee", SemanticType::Decimal));
        let sql = create_table_sql(&table);
        assert!(sql.contains("\"amount\" DECIMAL(15, 2) NOT NULL"));
        assert!(sql.contains("\"refund\" DECIMAL(13, 4) NOT NULL"));
        assert!(sql.contains("\"fee\" DECIMAL(10, 2) NOT NULL"));
    }

    #[test]
    fn enumerated_width_fits_longest_choice() {
        let long = "x".repeat(300);
        let table = TableSpec::new("steps").column(
            ColumnSpec::new("step", SemanticType::Enumerated)
                .with_constraint(ValueConstraint::one_of([long.as_str(), "short"])),
        );
        assert!(create_table_sql(&table).contains("\"step\" VARCHAR(300) NOT NULL"));
    }
}

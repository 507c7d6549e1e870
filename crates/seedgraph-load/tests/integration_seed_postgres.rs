use anyhow::{Context, Result, anyhow};
use seedgraph_core::{ColumnSpec, SchemaRegistry, SemanticType, TableSpec, ValueConstraint};
use seedgraph_generate::{FakeFieldGenerator, RowGenerator};
use seedgraph_load::{Loader, PostgresSink, RowCounts};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::env;

const SCHEMA: &str = "seedgraph_it";

fn database_url() -> Result<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .context("set TEST_DATABASE_URL or DATABASE_URL for integration tests")
}

fn graph() -> Result<SchemaRegistry> {
    let authors = TableSpec::in_schema(SCHEMA, "authors")
        .column(ColumnSpec::identifier("author_id"))
        .column(ColumnSpec::new("name", SemanticType::FullName))
        .column(ColumnSpec::new("joined_at", SemanticType::Timestamp));
    let posts = TableSpec::in_schema(SCHEMA, "posts")
        .column(ColumnSpec::identifier("post_id"))
        .column(ColumnSpec::new("author_id", SemanticType::Integer))
        .column(
            ColumnSpec::new("body", SemanticType::Paragraph)
                .with_constraint(ValueConstraint::MaxLength { max: 200 }),
        )
        .column(ColumnSpec::new("score", SemanticType::Decimal))
        .column(ColumnSpec::new("published", SemanticType::Boolean))
        .foreign_key("author_id", format!("{SCHEMA}.authors"), "author_id");
    Ok(SchemaRegistry::from_tables([authors, posts])?)
}

#[tokio::test]
#[ignore = "requires a running Postgres (TEST_DATABASE_URL)"]
async fn seeds_parent_and_child_tables() -> Result<()> {
    let db_url = database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&db_url)
        .await
        .context("connecting to Postgres")?;
    sqlx::query(&format!("DROP SCHEMA IF EXISTS \"{SCHEMA}\" CASCADE"))
        .execute(&pool)
        .await
        .context("dropping test schema")?;

    let options: PgConnectOptions = db_url.parse().context("parsing database url")?;
    let mut sink = PostgresSink::connect_with(options).await?.with_batch_size(7);
    let mut loader = Loader::new(RowGenerator::seeded(FakeFieldGenerator::new(), 42));
    let graph = graph()?;

    let report = loader.run(&graph, &RowCounts::uniform(25), &mut sink).await?;

    let authors = report
        .ranges
        .get(&format!("{SCHEMA}.authors"))
        .ok_or_else(|| anyhow!("expected authors range"))?;
    assert_eq!(authors.len(), 25);

    let (count, min_ref, max_ref): (i64, i32, i32) = sqlx::query_as(&format!(
        "SELECT COUNT(*), MIN(author_id), MAX(author_id) FROM \"{SCHEMA}\".\"posts\""
    ))
    .fetch_one(&pool)
    .await?;
    assert_eq!(count, 25);
    assert!(authors.contains(i64::from(min_ref)));
    assert!(authors.contains(i64::from(max_ref)));

    let orphans: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM \"{SCHEMA}\".\"posts\" p \
         LEFT JOIN \"{SCHEMA}\".\"authors\" a ON a.author_id = p.author_id \
         WHERE a.author_id IS NULL"
    ))
    .fetch_one(&pool)
    .await?;
    assert_eq!(orphans, 0);

    Ok(())
}

mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use seedgraph_core::{SchemaError, SchemaRegistry};
use seedgraph_generate::{FakeFieldGenerator, RowGenerator};
use seedgraph_load::{
    Catalog, LoadError, Loader, MemorySink, PostgresSink, RowCounts, SeedReport, Sink, SinkError,
};
use thiserror::Error;
use tracing::{error, info};

use config::{ConfigError, SeedConfig, load_schema_file};
use logging::{LogFormat, LoggingError, init_logging};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error("connection failed: {0}")]
    Connect(#[from] SinkError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("failed to encode report: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Configuration problems exit with 2, like clap usage errors.
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) | CliError::InvalidConfig(_) | CliError::Schema(_) => 2,
            CliError::Load(LoadError::Configuration(_) | LoadError::Schema(_)) => 2,
            _ => 1,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "seedgraph",
    version,
    about = "Seed related tables with synthetic rows, parents first"
)]
struct Args {
    /// Rows to insert into each table.
    #[arg(value_name = "ROWS", value_parser = clap::value_parser!(u64).range(1..))]
    rows: u64,
    /// TOML settings file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Built-in schema graph to seed.
    #[arg(long, conflicts_with = "schema_file")]
    catalog: Option<Catalog>,
    /// TOML file declaring `[[tables]]` to seed instead of a catalog.
    #[arg(long, value_name = "FILE")]
    schema_file: Option<PathBuf>,
    /// Per-table row count override, repeatable.
    #[arg(long = "rows", value_name = "TABLE=N", value_parser = parse_row_override)]
    row_overrides: Vec<(String, usize)>,
    /// Seed for repeatable output.
    #[arg(long)]
    seed: Option<u64>,
    /// Rows per INSERT statement.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: Option<u64>,
    #[arg(long)]
    dbname: Option<String>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Generate and validate against an in-memory sink without connecting.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Print the run report as JSON instead of the summary line.
    #[arg(long, default_value_t = false)]
    json: bool,
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    /// Append logs to this file instead of stderr.
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn parse_row_override(value: &str) -> Result<(String, usize), String> {
    let (table, rows) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TABLE=N, got '{value}'"))?;
    let table = table.trim();
    if table.is_empty() {
        return Err(format!("missing table name in '{value}'"));
    }
    let rows = rows
        .trim()
        .parse::<usize>()
        .map_err(|err| format!("invalid row count in '{value}': {err}"))?;
    Ok((table.to_string(), rows))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(event = "seed_failed", error = %err, table = err_table(&err));
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn err_table(err: &CliError) -> Option<&str> {
    match err {
        CliError::Load(load) => load.table(),
        _ => None,
    }
}

async fn run(args: Args) -> Result<String, CliError> {
    init_logging(args.log_format, args.log_file.as_deref())?;

    let settings = match &args.config {
        Some(path) => SeedConfig::load(path)?,
        None => SeedConfig::default(),
    };
    let settings = merge(settings, &args)?;
    let graph = build_graph(&settings)?;
    let counts = row_counts(&args, &settings)?;

    let rows = match settings.seed {
        Some(seed) => RowGenerator::seeded(FakeFieldGenerator::new(), seed),
        None => RowGenerator::new(FakeFieldGenerator::new()),
    };
    let mut loader = Loader::new(rows);

    let mut sink: Box<dyn Sink> = if args.dry_run {
        info!(event = "dry_run", tables = graph.len());
        Box::new(MemorySink::new())
    } else {
        let mut sink = PostgresSink::connect(&settings.connection).await?;
        if let Some(batch_size) = settings.batch_size {
            sink = sink.with_batch_size(batch_size);
        }
        Box::new(sink)
    };

    let report = loader.run(&graph, &counts, sink.as_mut()).await?;
    render(&report, args.json)
}

/// Apply command-line flags on top of file settings.
fn merge(mut settings: SeedConfig, args: &Args) -> Result<SeedConfig, CliError> {
    if let Some(catalog) = args.catalog {
        settings.catalog = Some(catalog);
        settings.schema_file = None;
    }
    if let Some(path) = &args.schema_file {
        settings.schema_file = Some(path.clone());
        settings.catalog = None;
    }
    if settings.catalog.is_some() && settings.schema_file.is_some() {
        return Err(CliError::InvalidConfig(
            "set either a catalog or a schema file, not both".to_string(),
        ));
    }
    if let Some(seed) = args.seed {
        settings.seed = Some(seed);
    }
    if let Some(batch_size) = args.batch_size {
        let batch_size = usize::try_from(batch_size)
            .map_err(|_| CliError::InvalidConfig(format!("batch size {batch_size} is too large")))?;
        settings.batch_size = Some(batch_size);
    }
    if settings.batch_size == Some(0) {
        return Err(CliError::InvalidConfig(
            "batch size must be positive".to_string(),
        ));
    }

    let connection = &mut settings.connection;
    if let Some(dbname) = &args.dbname {
        connection.dbname = dbname.clone();
    }
    if let Some(user) = &args.user {
        connection.user = user.clone();
    }
    if let Some(password) = &args.password {
        connection.password = password.clone();
    }
    if let Some(host) = &args.host {
        connection.host = host.clone();
    }
    if let Some(port) = args.port {
        connection.port = port;
    }
    Ok(settings)
}

fn build_graph(settings: &SeedConfig) -> Result<SchemaRegistry, CliError> {
    match &settings.schema_file {
        Some(path) => Ok(load_schema_file(path)?),
        None => Ok(settings.catalog.unwrap_or_default().graph()?),
    }
}

fn row_counts(args: &Args, settings: &SeedConfig) -> Result<RowCounts, CliError> {
    let default = usize::try_from(args.rows)
        .map_err(|_| CliError::InvalidConfig(format!("row count {} is too large", args.rows)))?;
    let mut counts = RowCounts::uniform(default);
    let flags = args.row_overrides.iter().map(|(table, rows)| (table, rows));
    for (table, rows) in settings.rows.iter().chain(flags) {
        counts = counts.with_override(table.clone(), *rows);
    }
    Ok(counts)
}

fn render(report: &SeedReport, json: bool) -> Result<String, CliError> {
    if json {
        Ok(serde_json::to_string_pretty(report)?)
    } else {
        Ok(report.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("seedgraph").chain(argv.iter().copied()))
    }

    #[test]
    fn rows_must_be_a_positive_integer() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["abc"]).is_err());
        assert!(parse(&["0"]).is_err());
        assert!(parse(&["-3"]).is_err());
        assert_eq!(parse(&["10"]).unwrap().rows, 10);
    }

    #[test]
    fn parses_overrides_and_connection_flags() {
        let args = parse(&[
            "5",
            "--catalog",
            "returns",
            "--rows",
            "returns.returns=20",
            "--rows",
            "returns.customer_feedback=0",
            "--port",
            "6543",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(args.catalog, Some(Catalog::Returns));
        assert_eq!(args.row_overrides.len(), 2);
        assert!(args.dry_run);

        let settings = merge(SeedConfig::default(), &args).unwrap();
        assert_eq!(settings.connection.port, 6543);
        assert_eq!(settings.connection.host, "localhost");

        let counts = row_counts(&args, &settings).unwrap();
        assert_eq!(counts.for_table("returns.returns"), 20);
        assert_eq!(counts.for_table("returns.customer_feedback"), 0);
        assert_eq!(counts.for_table("returns.return_processing"), 5);
    }

    #[test]
    fn catalog_and_schema_file_conflict() {
        assert!(parse(&["5", "--catalog", "orders", "--schema-file", "s.toml"]).is_err());
    }

    #[test]
    fn flags_override_file_settings() {
        let file = SeedConfig {
            seed: Some(1),
            catalog: Some(Catalog::Orders),
            ..SeedConfig::default()
        };
        let args = parse(&["3", "--seed", "9", "--schema-file", "tables.toml"]).unwrap();
        let settings = merge(file, &args).unwrap();
        assert_eq!(settings.seed, Some(9));
        assert_eq!(settings.catalog, None);
        assert_eq!(settings.schema_file, Some(PathBuf::from("tables.toml")));
    }

    #[test]
    fn rejects_malformed_row_override() {
        assert!(parse_row_override("orders").is_err());
        assert!(parse_row_override("=4").is_err());
        assert!(parse_row_override("orders.orders=x").is_err());
        assert_eq!(
            parse_row_override("orders.orders=4"),
            Ok(("orders.orders".to_string(), 4))
        );
    }

    #[test]
    fn configuration_failures_exit_with_two() {
        assert_eq!(CliError::InvalidConfig("x".into()).exit_code(), 2);
        assert_eq!(
            CliError::Load(LoadError::Configuration("x".into())).exit_code(),
            2
        );
        assert_eq!(CliError::Connect(SinkError::Closed).exit_code(), 1);
    }

    #[tokio::test]
    async fn dry_run_seeds_catalog_in_memory() {
        let graph = Catalog::Orders.graph().unwrap();
        let mut loader = Loader::new(RowGenerator::seeded(FakeFieldGenerator::new(), 3));
        let mut sink: Box<dyn Sink> = Box::new(MemorySink::new());
        let report = loader
            .run(&graph, &RowCounts::uniform(4), sink.as_mut())
            .await
            .unwrap();
        assert_eq!(
            render(&report, false).unwrap(),
            "Inserted 4 rows into 'orders.orders', 'orders.products', 'orders.order_details' tables."
        );
        let json: serde_json::Value = serde_json::from_str(&render(&report, true).unwrap()).unwrap();
        assert_eq!(json["tables"].as_array().map(Vec::len), Some(3));
    }
}

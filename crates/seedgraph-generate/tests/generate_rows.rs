use chrono::{TimeZone, Utc};
use seedgraph_core::{
    ColumnSpec, GeneratedValue, IdentifierRange, SchemaRegistry, SemanticType, TableSpec,
    ValueConstraint,
};
use seedgraph_generate::{FakeFieldGenerator, ParentRanges, RowGenerator};

fn fields() -> FakeFieldGenerator {
    let now = Utc
        .with_ymd_and_hms(2026, 10, 19, 0, 0, 0)
        .single()
        .expect("valid date");
    FakeFieldGenerator::with_now(now)
}

fn returns_graph() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .register(
            TableSpec::in_schema("returns", "returns")
                .column(ColumnSpec::identifier("return_id"))
                .column(ColumnSpec::new("reason", SemanticType::Sentence)),
        )
        .expect("register returns");
    registry
        .register(
            TableSpec::in_schema("returns", "return_processing")
                .column(ColumnSpec::identifier("processing_id"))
                .column(ColumnSpec::new("return_id", SemanticType::Integer))
                .column(
                    ColumnSpec::new("status", SemanticType::Enumerated).with_constraint(
                        ValueConstraint::one_of(["Pending", "Completed", "Cancelled"]),
                    ),
                )
                .column(ColumnSpec::new("update_date", SemanticType::Timestamp))
                .foreign_key("return_id", "returns.returns", "return_id"),
        )
        .expect("register return_processing");
    registry
}

#[test]
fn generated_rows_match_table_shape() {
    let registry = returns_graph();
    let table = registry.get("returns.return_processing").expect("table");
    let mut ranges = ParentRanges::new();
    ranges.insert(
        "returns.returns".to_string(),
        IdentifierRange::new(1, 10).expect("range"),
    );

    let mut rows = RowGenerator::seeded(fields(), 99);
    let batch = rows.generate(table, 25, &ranges).expect("generate");

    assert_eq!(batch.table(), "returns.return_processing");
    assert_eq!(batch.columns(), ["return_id", "status", "update_date"].map(String::from));
    for row in batch.rows() {
        assert!(matches!(row[0], GeneratedValue::Int(id) if (1..=10).contains(&id)));
        assert!(matches!(
            row[1].as_str(),
            Some("Pending" | "Completed" | "Cancelled")
        ));
        assert!(matches!(row[2], GeneratedValue::Timestamp(_)));
    }
}

#[test]
fn seeded_generation_is_repeatable() {
    let registry = returns_graph();
    let table = registry.get("returns.returns").expect("table");

    let first = RowGenerator::seeded(fields(), 7)
        .generate(table, 10, &ParentRanges::new())
        .expect("first");
    let second = RowGenerator::seeded(fields(), 7)
        .generate(table, 10, &ParentRanges::new())
        .expect("second");

    assert_eq!(first, second);
}

use seedgraph_core::{ColumnSpec, SemanticType, TableSpec, ValueConstraint};

#[test]
fn serializes_table_spec_deterministically() {
    let table = TableSpec::in_schema("orders", "order_details")
        .column(ColumnSpec::identifier("order_detail_id"))
        .column(ColumnSpec::new("order_id", SemanticType::Integer))
        .column(
            ColumnSpec::new("quantity", SemanticType::Integer)
                .with_constraint(ValueConstraint::IntRange { min: 0, max: 99 }),
        )
        .foreign_key("order_id", "orders.orders", "order_id");

    let json = serde_json::to_string_pretty(&table).expect("serialize table");
    let expected = r#"{
  "schema": "orders",
  "name": "order_details",
  "columns": [
    {
      "name": "order_detail_id",
      "semantic": "identifier",
      "nullable": false
    },
    {
      "name": "order_id",
      "semantic": "integer",
      "nullable": false
    },
    {
      "name": "quantity",
      "semantic": "integer",
      "constraint": {
        "kind": "int_range",
        "min": 0,
        "max": 99
      },
      "nullable": false
    }
  ],
  "foreign_keys": [
    {
      "column": "order_id",
      "parent": "orders.orders",
      "parent_column": "order_id",
      "enforced": true
    }
  ]
}"#;
    assert_eq!(json, expected);
}

#[test]
fn bare_tables_omit_namespace_and_keys() {
    let table = TableSpec::new("products").column(ColumnSpec::identifier("id"));
    let json = serde_json::to_value(&table).expect("serialize table");
    assert!(json.get("schema").is_none());
    assert!(json.get("foreign_keys").is_none());
}

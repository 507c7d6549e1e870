//! Schema graphs shipped with the tool.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use seedgraph_core::{
    ColumnSpec, SchemaError, SchemaRegistry, SemanticType, TableSpec, ValueConstraint,
};

const PROCESSING_STEPS: [&str; 4] = ["Received", "Under Review", "Refunded", "Declined"];
const PROCESSING_STATUSES: [&str; 3] = ["Pending", "Completed", "Cancelled"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Catalog {
    /// Orders, products and order lines.
    #[default]
    Orders,
    /// Returns with feedback and processing history.
    Returns,
    /// Both, with returns pointing at seeded orders.
    Commerce,
}

impl Catalog {
    pub const ALL: [Catalog; 3] = [Catalog::Orders, Catalog::Returns, Catalog::Commerce];

    pub fn name(self) -> &'static str {
        match self {
            Catalog::Orders => "orders",
            Catalog::Returns => "returns",
            Catalog::Commerce => "commerce",
        }
    }

    /// Table definitions in parent-first order.
    pub fn tables(self) -> Vec<TableSpec> {
        match self {
            Catalog::Orders => orders_tables(),
            Catalog::Returns => returns_tables(false),
            Catalog::Commerce => {
                let mut tables = orders_tables();
                tables.extend(returns_tables(true));
                tables
            }
        }
    }

    pub fn graph(self) -> Result<SchemaRegistry, SchemaError> {
        SchemaRegistry::from_tables(self.tables())
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Catalog {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Catalog::ALL
            .into_iter()
            .find(|catalog| catalog.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                format!("unknown catalog '{value}' (expected orders, returns or commerce)")
            })
    }
}

fn int_range(min: i64, max: i64) -> ValueConstraint {
    ValueConstraint::IntRange { min, max }
}

fn money() -> ValueConstraint {
    ValueConstraint::DecimalRange {
        min: 0.0,
        max: 999.99,
        scale: 2,
    }
}

fn orders_tables() -> Vec<TableSpec> {
    let orders = TableSpec::in_schema("orders", "orders")
        .column(ColumnSpec::identifier("order_id"))
        .column(ColumnSpec::new("first_name", SemanticType::FirstName))
        .column(ColumnSpec::new("last_name", SemanticType::LastName))
        .column(ColumnSpec::new("address", SemanticType::Address))
        .column(ColumnSpec::new("order_date", SemanticType::Timestamp));

    let products = TableSpec::in_schema("orders", "products")
        .column(ColumnSpec::identifier("product_id"))
        .column(ColumnSpec::new("name", SemanticType::Word))
        .column(
            ColumnSpec::new("description", SemanticType::Paragraph)
                .with_constraint(ValueConstraint::MaxLength { max: 200 }),
        )
        .column(ColumnSpec::new("price", SemanticType::Decimal).with_constraint(money()))
        .column(ColumnSpec::new("in_stock", SemanticType::Boolean));

    let order_details = TableSpec::in_schema("orders", "order_details")
        .column(ColumnSpec::identifier("order_detail_id"))
        .column(ColumnSpec::new("order_id", SemanticType::Integer))
        .column(ColumnSpec::new("product_id", SemanticType::Integer))
        .column(ColumnSpec::new("quantity", SemanticType::Integer).with_constraint(int_range(0, 99)))
        .column(ColumnSpec::new("price_per_unit", SemanticType::Decimal).with_constraint(money()))
        .foreign_key("order_id", "orders.orders", "order_id")
        .foreign_key("product_id", "orders.products", "product_id");

    vec![orders, products, order_details]
}

fn returns_tables(linked_to_orders: bool) -> Vec<TableSpec> {
    let returns = TableSpec::in_schema("returns", "returns")
        .column(ColumnSpec::identifier("return_id"))
        .column(ColumnSpec::new("product_name", SemanticType::Word))
        .column(ColumnSpec::new("return_date", SemanticType::Timestamp))
        .column(ColumnSpec::new("reason", SemanticType::Sentence));
    let returns = if linked_to_orders {
        returns
            .column(ColumnSpec::new("order_id", SemanticType::Integer))
            .soft_foreign_key("order_id", "orders.orders", "order_id")
    } else {
        returns.column(
            ColumnSpec::new("order_id", SemanticType::Integer).with_constraint(int_range(1, 1000)),
        )
    };

    let customer_feedback = TableSpec::in_schema("returns", "customer_feedback")
        .column(ColumnSpec::identifier("feedback_id"))
        .column(ColumnSpec::new("return_id", SemanticType::Integer))
        .column(
            ColumnSpec::new("customer_id", SemanticType::Integer)
                .with_constraint(int_range(1, 1000)),
        )
        .column(ColumnSpec::new("feedback", SemanticType::Paragraph))
        .column(ColumnSpec::new("feedback_date", SemanticType::Timestamp))
        .foreign_key("return_id", "returns.returns", "return_id");

    let return_processing = TableSpec::in_schema("returns", "return_processing")
        .column(ColumnSpec::identifier("processing_id"))
        .column(ColumnSpec::new("return_id", SemanticType::Integer))
        .column(
            ColumnSpec::new("processing_step", SemanticType::Enumerated)
                .with_constraint(ValueConstraint::one_of(PROCESSING_STEPS)),
        )
        .column(
            ColumnSpec::new("status", SemanticType::Enumerated)
                .with_constraint(ValueConstraint::one_of(PROCESSING_STATUSES)),
        )
        .column(ColumnSpec::new("update_date", SemanticType::Timestamp))
        .foreign_key("return_id", "returns.returns", "return_id");

    vec![returns, customer_feedback, return_processing]
}

//! FILENAME: tests/common/mod.rs
//! Fixtures and assertion helpers for pivot-engine integration tests.

#![allow(dead_code)]

use engine::{CellValue, RowIndex, Table};
use pivot_engine::{group_label, HeaderNode, PivotResult};

pub struct SalesFixture;

impl SalesFixture {
    pub fn headers() -> Vec<&'static str> {
        vec!["Region", "Product", "Quarter", "Sales", "Quantity"]
    }

    pub fn data() -> Vec<(&'static str, &'static str, &'static str, f64, f64)> {
        vec![
            ("North", "Widget", "Q1", 10000.0, 100.0),
            ("North", "Widget", "Q2", 12000.0, 120.0),
            ("North", "Gadget", "Q1", 8000.0, 80.0),
            ("North", "Gadget", "Q2", 9000.0, 90.0),
            ("South", "Widget", "Q1", 15000.0, 150.0),
            ("South", "Widget", "Q2", 14000.0, 140.0),
            ("South", "Gadget", "Q1", 11000.0, 110.0),
            ("South", "Gadget", "Q2", 13000.0, 130.0),
            ("East", "Widget", "Q1", 9000.0, 90.0),
            ("East", "Widget", "Q2", 11000.0, 110.0),
            ("East", "Gadget", "Q1", 7000.0, 70.0),
            ("East", "Gadget", "Q2", 8500.0, 85.0),
        ]
    }

    /// The sales data as a source table.
    pub fn table() -> Table {
        let fields = Self::headers().into_iter().map(String::from).collect();
        let rows = Self::data()
            .into_iter()
            .map(|(region, product, quarter, sales, quantity)| {
                vec![
                    CellValue::text(region),
                    CellValue::text(product),
                    CellValue::text(quarter),
                    CellValue::Number(sales),
                    CellValue::Number(quantity),
                ]
            })
            .collect();
        Table::from_rows(fields, rows)
    }

    /// The sales data plus rows with a missing region and a non-numeric sale.
    pub fn table_with_gaps() -> Table {
        let mut table = Self::table();
        table.push_row(vec![
            CellValue::Empty,
            CellValue::text("Widget"),
            CellValue::text("Q1"),
            CellValue::Number(500.0),
            CellValue::Number(5.0),
        ]);
        table.push_row(vec![
            CellValue::text("East"),
            CellValue::text("Gizmo"),
            CellValue::text("Q2"),
            CellValue::text("pending"),
            CellValue::Number(1.0),
        ]);
        table
    }
}

/// The three-row example from the engine's documentation.
pub fn region_product_table() -> Table {
    Table::from_json_rows(
        r#"[
            {"region": "East", "product": "A", "sales": 10},
            {"region": "East", "product": "B", "sales": 20},
            {"region": "West", "product": "A", "sales": 5}
        ]"#,
    )
    .expect("fixture json is valid")
}

/// Source rows whose group labels match every `(field, value)` pair.
pub fn matching_rows(table: &Table, pairs: &[(String, String)]) -> Vec<RowIndex> {
    (0..table.len())
        .filter(|&row| {
            pairs.iter().all(|(field, value)| {
                group_label(table.value_opt(row, table.field_index(field))) == *value
            })
        })
        .collect()
}

/// Field values identifying a node's rows.
pub fn pairs_of(node: &HeaderNode) -> Vec<(String, String)> {
    node.header().original_values.iter().cloned().collect()
}

pub fn leaf_keys(nodes: &[HeaderNode]) -> Vec<String> {
    pivot_engine::flatten_nodes(nodes)
        .into_iter()
        .filter(|n| n.is_leaf())
        .map(|n| n.key().to_string())
        .collect()
}

/// Assert that a cell measure holds a number close to `expected`.
pub fn assert_value(result: &PivotResult, row_key: &str, column_key: &str, measure: &str, expected: f64) {
    match result.value(row_key, column_key, measure) {
        Some(n) => assert!(
            (n - expected).abs() < 0.001,
            "[{}][{}] {} expected {} but got {}",
            row_key,
            column_key,
            measure,
            expected,
            n
        ),
        None => panic!(
            "[{}][{}] {} expected {} but had no value",
            row_key, column_key, measure, expected
        ),
    }
}

//! FILENAME: tests/test_export.rs
//! Integration tests for pivot export.

use engine::Table;
use persistence::{
    build_export_sheet, export_pivot_to_buffer, export_pivot_to_xlsx, ExportCell, ExportSheet,
    PersistenceError, RowKind,
};
use pivot_engine::{calculate_pivot, AggregationType, DisplayOptions, PivotConfig, PivotResult};
use std::collections::BTreeSet;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn sales_table() -> Table {
    Table::from_json_rows(
        r#"[
            {"Region": "North", "Product": "Widget", "Quarter": "Q1", "Sales": 10000},
            {"Region": "North", "Product": "Gadget", "Quarter": "Q2", "Sales": 9000},
            {"Region": "South", "Product": "Widget", "Quarter": "Q1", "Sales": 15000},
            {"Region": "South", "Product": "Widget", "Quarter": "Q2", "Sales": 14000},
            {"Region": "East",  "Product": "Gadget", "Quarter": "Q1", "Sales": 7000}
        ]"#,
    )
    .unwrap()
}

fn nested_config() -> PivotConfig {
    PivotConfig::new()
        .with_row_field("Region")
        .with_row_field("Quarter")
        .with_column_field("Product")
        .with_value("Sales", AggregationType::Sum)
        .with_value("Sales", AggregationType::Count)
}

/// (row label, column label, measure) of every exported number.
fn exported_pairs(sheet: &ExportSheet) -> BTreeSet<(String, String, String)> {
    let leaf_header_row = |column: usize| -> String {
        (0..sheet.header_rows - 1)
            .rev()
            .find_map(|r| sheet.cell(r, column).as_text())
            .or_else(|| {
                // merged labels sit on the first column of their span
                (sheet.label_columns..=column).rev().find_map(|c| {
                    (0..sheet.header_rows - 1)
                        .rev()
                        .find_map(|r| sheet.cell(r, c).as_text())
                })
            })
            .unwrap_or_default()
            .to_string()
    };

    let mut pairs = BTreeSet::new();
    for r in sheet.header_rows..sheet.height() {
        let label = (0..sheet.label_columns)
            .find_map(|c| sheet.cell(r, c).as_text())
            .unwrap_or_default()
            .to_string();
        for c in sheet.label_columns..sheet.width() {
            if let ExportCell::Number(_) = sheet.cell(r, c) {
                let measure = sheet
                    .cell(sheet.header_rows - 1, c)
                    .as_text()
                    .unwrap_or_default()
                    .to_string();
                pairs.insert((label.clone(), leaf_header_row(c), measure));
            }
        }
    }
    pairs
}

/// (row label, column label, measure) of every value a renderer would show.
fn visible_pairs(result: &PivotResult) -> BTreeSet<(String, String, String)> {
    let mut pairs = BTreeSet::new();
    for row in result.data_rows() {
        for column in result.data_columns() {
            let Some(cell) = result.data_matrix.get(row.slot(), column.slot()) else {
                continue;
            };
            for (measure, value) in cell.iter() {
                if value.is_some() {
                    pairs.insert((
                        row.label().to_string(),
                        column.label().to_string(),
                        measure.to_string(),
                    ));
                }
            }
        }
    }
    pairs
}

// ============================================================================
// LAYOUT
// ============================================================================

#[test]
fn test_export_matches_display_for_every_option_set() {
    let table = sales_table();
    let config = nested_config();

    for options in [
        DisplayOptions::default(),
        DisplayOptions::grand_totals_only(),
        DisplayOptions::no_totals(),
        DisplayOptions {
            show_row_grand_totals: false,
            show_column_subtotals: false,
            ..DisplayOptions::default()
        },
    ] {
        let result = calculate_pivot(&table, &config, &options).unwrap();
        let sheet = build_export_sheet(&result, &config, &options);
        assert_eq!(exported_pairs(&sheet), visible_pairs(&result), "{:?}", options);
    }
}

#[test]
fn test_row_labels_sit_at_their_depth() {
    let table = sales_table();
    let config = nested_config();
    let options = DisplayOptions::default();
    let result = calculate_pivot(&table, &config, &options).unwrap();
    let sheet = build_export_sheet(&result, &config, &options);

    assert_eq!(sheet.label_columns, 2);
    let first = sheet.header_rows;
    assert_eq!(sheet.cell(first, 0).as_text(), Some("East"));
    assert!(sheet.cell(first, 1).is_empty());
    assert_eq!(sheet.cell(first + 1, 1).as_text(), Some("Q1"));
    assert_eq!(sheet.cell(first + 2, 0).as_text(), Some("Subtotal East"));
    assert_eq!(sheet.row_kinds[first + 2], RowKind::Subtotal);
    assert_eq!(sheet.row_kinds.last(), Some(&RowKind::GrandTotal));
}

#[test]
fn test_missing_cells_are_blank_not_zero() {
    let table = sales_table();
    let config = nested_config();
    let options = DisplayOptions::no_totals();
    let result = calculate_pivot(&table, &config, &options).unwrap();
    let sheet = build_export_sheet(&result, &config, &options);

    // East/Q1 has no Widget sales; Gadget occupies the first two data columns
    let east_q1 = sheet.header_rows + 1;
    assert_eq!(sheet.cell(east_q1, 2).as_number(), Some(7000.0));
    assert!(sheet.cell(east_q1, 4).is_empty());
    assert!(sheet.cell(east_q1, 5).is_empty());
}

// ============================================================================
// XLSX OUTPUT
// ============================================================================

#[test]
fn test_export_writes_xlsx_file() {
    let table = sales_table();
    let config = nested_config();
    let options = DisplayOptions::default();
    let result = calculate_pivot(&table, &config, &options).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pivot.xlsx");
    export_pivot_to_xlsx(&result, &config, &options, &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.len() > 100);
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn test_export_to_buffer() {
    let table = sales_table();
    let config = nested_config();
    let options = DisplayOptions::grand_totals_only();
    let result = calculate_pivot(&table, &config, &options).unwrap();

    let bytes = export_pivot_to_buffer(&result, &config, &options).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn test_export_to_missing_directory_fails() {
    let table = sales_table();
    let config = nested_config();
    let options = DisplayOptions::default();
    let result = calculate_pivot(&table, &config, &options).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("pivot.xlsx");
    let err = export_pivot_to_xlsx(&result, &config, &options, &path).unwrap_err();
    assert!(matches!(err, PersistenceError::XlsxWrite(_) | PersistenceError::Io(_)));
}

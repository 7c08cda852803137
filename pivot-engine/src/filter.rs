//! FILENAME: pivot-engine/src/filter.rs
//! Pre-aggregation filter stage.
//!
//! Runs before any grouping. A row survives when, for every filter with a
//! non-empty allowed set, the string form of its field value is in that set.
//! Filters with an empty set are pass-through so a host can show "field
//! picked, no values chosen yet" without changing results.
//!
//! A null or missing value is selected by `"null"`, `"undefined"` or the
//! `"N/A"` label its group is shown under; it never matches `""`.

use engine::{CellValue, RowIndex, Table};
use rustc_hash::FxHashSet;

use crate::definition::FieldFilter;
use crate::view::NULL_GROUP_LABEL;

/// Allowed-set entries that select a null or missing value.
pub const NULL_FILTER_TOKENS: [&str; 3] = ["null", "undefined", NULL_GROUP_LABEL];

/// Ascending indices of the source rows taking part in a computation.
pub type RowSet = Vec<RowIndex>;

/// Returns every row index of `table`.
pub fn all_rows(table: &Table) -> RowSet {
    (0..table.len()).collect()
}

/// Applies the filters in order and returns the surviving row indices.
///
/// A filter on a field the table does not have reads every row as missing.
pub fn apply_filters(table: &Table, filters: &[FieldFilter]) -> RowSet {
    let active: Vec<(Option<usize>, FxHashSet<&str>)> = filters
        .iter()
        .filter(|f| f.is_restrictive())
        .map(|f| {
            let allowed = f.allowed_values.iter().map(String::as_str).collect();
            (table.field_index(&f.field), allowed)
        })
        .collect();

    if active.is_empty() {
        return all_rows(table);
    }

    let rows: RowSet = (0..table.len())
        .filter(|&row| {
            active.iter().all(|(field, allowed)| {
                is_allowed(table.value_opt(row, *field), allowed)
            })
        })
        .collect();

    log::debug!(
        target: "pivot",
        "filter stage kept {} of {} rows ({} active filters)",
        rows.len(),
        table.len(),
        active.len()
    );

    rows
}

fn is_allowed(value: &CellValue, allowed: &FxHashSet<&str>) -> bool {
    match value {
        CellValue::Empty => NULL_FILTER_TOKENS.iter().any(|t| allowed.contains(*t)),
        other => allowed.contains(other.display_value().as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_table() -> Table {
        Table::from_json_rows(
            r#"[
                {"region": "East", "year": 2023, "sales": 10},
                {"region": "West", "year": 2024, "sales": 20},
                {"region": "East", "year": 2024, "sales": 30},
                {"region": null,   "year": 2024, "sales": 40}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn empty_allowed_set_is_pass_through() {
        let table = create_test_table();
        let rows = apply_filters(&table, &[FieldFilter::new("region", Vec::<String>::new())]);
        assert_eq!(rows, vec![0, 1, 2, 3]);
    }

    #[test]
    fn filters_match_string_coerced_values() {
        let table = create_test_table();
        let rows = apply_filters(&table, &[FieldFilter::new("year", ["2024"])]);
        assert_eq!(rows, vec![1, 2, 3]);
    }

    #[test]
    fn all_filters_must_pass() {
        let table = create_test_table();
        let rows = apply_filters(
            &table,
            &[
                FieldFilter::new("year", ["2024"]),
                FieldFilter::new("region", ["East", "North"]),
            ],
        );
        assert_eq!(rows, vec![2]);
    }

    #[test]
    fn null_values_match_null_tokens() {
        let table = create_test_table();
        for token in NULL_FILTER_TOKENS {
            let rows = apply_filters(&table, &[FieldFilter::new("region", [token])]);
            assert_eq!(rows, vec![3], "{}", token);
        }
        let rows = apply_filters(&table, &[FieldFilter::new("region", ["East", "N/A"])]);
        assert_eq!(rows, vec![0, 2, 3]);
    }

    #[test]
    fn empty_string_does_not_select_nulls() {
        let table = Table::from_json_rows(r#"[{"r": null}, {"r": ""}, {"r": "E"}]"#).unwrap();
        let rows = apply_filters(&table, &[FieldFilter::new("r", [""])]);
        assert_eq!(rows, vec![1]);
    }

    #[test]
    fn unknown_field_reads_as_missing() {
        let table = create_test_table();
        let rows = apply_filters(&table, &[FieldFilter::new("channel", ["web"])]);
        assert!(rows.is_empty());

        let rows = apply_filters(&table, &[FieldFilter::new("channel", ["null"])]);
        assert_eq!(rows, vec![0, 1, 2, 3]);
    }
}

//! FILENAME: pivot-engine/src/tree.rs
//! Hierarchy builder.
//!
//! Recursively partitions a row set by the values of an ordered field list.
//! Each level groups by one field; rows whose value is null or missing land
//! in an "N/A" group so every row belongs to exactly one leaf path. Siblings
//! are ordered by label.

use std::cmp::Ordering;

use engine::{CellValue, FieldIndex, RowIndex, Table};
use rustc_hash::FxHashMap;

use crate::view::{FieldPath, HeaderNode, NodeHeader, NULL_GROUP_LABEL};

/// A dimension field resolved against the source table.
#[derive(Debug, Clone)]
pub(crate) struct AxisField<'a> {
    pub name: &'a str,
    /// `None` when the table has no such field; every row reads as null.
    pub index: Option<FieldIndex>,
}

impl<'a> AxisField<'a> {
    pub fn resolve(table: &Table, fields: &'a [String]) -> Vec<AxisField<'a>> {
        fields
            .iter()
            .map(|name| AxisField {
                name,
                index: table.field_index(name),
            })
            .collect()
    }
}

/// One group of the intermediate tree, still carrying its rows.
#[derive(Debug, Clone)]
pub(crate) struct GroupNode {
    pub label: String,
    pub level: usize,
    pub path: FieldPath,
    /// Ascending indices of every row below this node.
    pub rows: Vec<RowIndex>,
    pub children: Vec<GroupNode>,
}

impl GroupNode {
    pub fn key(&self) -> String {
        node_key(&self.path)
    }
}

/// Label of a field value when used as a group.
pub fn group_label(value: &CellValue) -> String {
    match value {
        CellValue::Empty => NULL_GROUP_LABEL.to_string(),
        other => other.display_value(),
    }
}

/// Canonical node key: the `field:value` pairs sorted and joined with `|`,
/// so the key depends only on which pairs are present.
///
/// `\`, `|` and `:` inside names and values are backslash-escaped, so two
/// different paths never share a key.
pub fn node_key(path: &FieldPath) -> String {
    let mut parts: Vec<String> = path
        .iter()
        .map(|(field, value)| {
            format!("{}:{}", escape_key_part(field), escape_key_part(value))
        })
        .collect();
    parts.sort();
    parts.join("|")
}

fn escape_key_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for ch in part.chars() {
        if matches!(ch, '\\' | '|' | ':') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Sibling order: case-insensitive first, then lower case before upper case
/// among labels that differ only in case. Non-ASCII letters compare by code
/// point, so this only approximates locale collation.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Groups `rows` by `fields[0]` and recurses into the remaining fields.
/// An empty field list yields no groups.
pub(crate) fn group_rows(
    table: &Table,
    rows: &[RowIndex],
    fields: &[AxisField<'_>],
    level: usize,
    parent_path: &FieldPath,
) -> Vec<GroupNode> {
    let Some((field, rest)) = fields.split_first() else {
        return Vec::new();
    };

    let mut buckets: FxHashMap<String, Vec<RowIndex>> = FxHashMap::default();
    for &row in rows {
        let label = group_label(table.value_opt(row, field.index));
        buckets.entry(label).or_default().push(row);
    }

    let mut groups: Vec<(String, Vec<RowIndex>)> = buckets.into_iter().collect();
    groups.sort_by(|(a, _), (b, _)| compare_labels(a, b));

    groups
        .into_iter()
        .map(|(label, rows)| {
            let mut path = parent_path.clone();
            path.push((field.name.to_string(), label.clone()));
            let children = group_rows(table, &rows, rest, level + 1, &path);
            GroupNode {
                label,
                level,
                path,
                rows,
                children,
            }
        })
        .collect()
}

/// Builds the header tree for `fields` over `rows`.
///
/// Nodes are plain groups numbered in pre-order through their `slot`; no
/// subtotal or grand-total nodes are added.
pub fn build_tree(table: &Table, rows: &[RowIndex], fields: &[String]) -> Vec<HeaderNode> {
    let fields = AxisField::resolve(table, fields);
    let groups = group_rows(table, rows, &fields, 0, &FieldPath::new());
    let mut next_slot = 0;
    into_headers(groups, &mut next_slot)
}

fn into_headers(groups: Vec<GroupNode>, next_slot: &mut usize) -> Vec<HeaderNode> {
    groups
        .into_iter()
        .map(|group| {
            let header = NodeHeader {
                key: group.key(),
                label: group.label,
                level: group.level,
                original_values: group.path,
                slot: *next_slot,
            };
            *next_slot += 1;
            HeaderNode::Group {
                header,
                children: into_headers(group.children, next_slot),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::all_rows;
    use crate::view::flatten_nodes;

    fn create_test_table() -> Table {
        Table::from_json_rows(
            r#"[
                {"region": "West", "product": "b", "sales": 1},
                {"region": "East", "product": "B", "sales": 2},
                {"region": null,   "product": "a", "sales": 3},
                {"region": "East", "product": "a", "sales": 4},
                {"product": "a", "sales": 5}
            ]"#,
        )
        .unwrap()
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn groups_are_sorted_and_nulls_become_na() {
        let table = create_test_table();
        let tree = build_tree(&table, &all_rows(&table), &fields(&["region"]));
        let labels: Vec<&str> = tree.iter().map(|n| n.label()).collect();
        assert_eq!(labels, vec!["East", "N/A", "West"]);
        assert!(tree.iter().all(HeaderNode::is_leaf));
    }

    #[test]
    fn labels_sort_case_insensitively_with_stable_tie_break() {
        let table = create_test_table();
        let tree = build_tree(&table, &all_rows(&table), &fields(&["product"]));
        let labels: Vec<&str> = tree.iter().map(|n| n.label()).collect();
        assert_eq!(labels, vec!["a", "b", "B"]);
    }

    #[test]
    fn separators_in_values_do_not_collide() {
        let table = Table::from_json_rows(
            r#"[
                {"a": "x|b:y", "b": "z"},
                {"a": "x",     "b": "y"}
            ]"#,
        )
        .unwrap();
        let tree = build_tree(&table, &all_rows(&table), &fields(&["a", "b"]));
        let mut keys: Vec<String> = flatten_nodes(&tree)
            .iter()
            .map(|n| n.key().to_string())
            .collect();

        assert!(keys.contains(&r"a:x\|b\:y".to_string()));
        assert!(keys.contains(&"a:x|b:y".to_string()));
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn escaped_keys_keep_backslashes_distinct() {
        let one: FieldPath = [("f".to_string(), r"a\".to_string())].into_iter().collect();
        let two: FieldPath = [("f".to_string(), "a".to_string())].into_iter().collect();
        assert_eq!(node_key(&one), r"f:a\\");
        assert_ne!(node_key(&one), node_key(&two));
    }

    #[test]
    fn nested_levels_accumulate_original_values() {
        let table = create_test_table();
        let tree = build_tree(&table, &all_rows(&table), &fields(&["region", "product"]));

        let east = &tree[0];
        assert_eq!(east.level(), 0);
        assert_eq!(east.children().len(), 2);

        let east_a = &east.children()[0];
        assert_eq!(east_a.level(), 1);
        assert_eq!(east_a.key(), "product:a|region:East");
        assert_eq!(
            east_a.header().original_values.as_slice(),
            &[
                ("region".to_string(), "East".to_string()),
                ("product".to_string(), "a".to_string()),
            ]
        );
    }

    #[test]
    fn keys_do_not_depend_on_field_order() {
        let table = create_test_table();
        let rows = all_rows(&table);
        let by_region = build_tree(&table, &rows, &fields(&["region", "product"]));
        let by_product = build_tree(&table, &rows, &fields(&["product", "region"]));

        let mut a: Vec<String> = flatten_nodes(&by_region)
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.key().to_string())
            .collect();
        let mut b: Vec<String> = flatten_nodes(&by_product)
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.key().to_string())
            .collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn slots_follow_pre_order() {
        let table = create_test_table();
        let tree = build_tree(&table, &all_rows(&table), &fields(&["region", "product"]));
        let slots: Vec<usize> = flatten_nodes(&tree).iter().map(|n| n.slot()).collect();
        assert_eq!(slots, (0..slots.len()).collect::<Vec<_>>());
    }

    #[test]
    fn every_row_lands_in_exactly_one_leaf() {
        let table = create_test_table();
        let groups = group_rows(
            &table,
            &all_rows(&table),
            &AxisField::resolve(&table, &fields(&["region", "product"])),
            0,
            &FieldPath::new(),
        );

        fn leaf_rows(groups: &[GroupNode], out: &mut Vec<RowIndex>) {
            for g in groups {
                if g.children.is_empty() {
                    out.extend(&g.rows);
                } else {
                    leaf_rows(&g.children, out);
                }
            }
        }

        let mut rows = Vec::new();
        leaf_rows(&groups, &mut rows);
        rows.sort_unstable();
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_field_list_builds_nothing() {
        let table = create_test_table();
        assert!(build_tree(&table, &all_rows(&table), &[]).is_empty());
    }
}

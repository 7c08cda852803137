//! FILENAME: pivot-engine/src/engine.rs
//! Pivot Engine - The calculation core that turns a table into a PivotResult.
//!
//! Algorithm:
//! 1. Filter the source rows
//! 2. Group the surviving rows into a row tree and a column tree
//! 3. Lay each tree out as an axis: every node gets a slot, subtotal slots
//!    follow their group, grand totals close the axis
//! 4. Cross-tabulate: for each (row slot, column slot) carrying data,
//!    aggregate the rows they share
//!
//! Rows are bucketed once per axis, so subtotals and grand totals aggregate
//! their own row sets directly instead of re-filtering the table.

use std::borrow::Cow;
use std::ops::Range;

use engine::{RowIndex, Table};
use parser::ParseError;

use crate::aggregate::MeasurePlan;
use crate::definition::{DisplayOptions, PivotConfig};
use crate::filter::{all_rows, apply_filters, RowSet};
use crate::tree::{group_label, group_rows, AxisField, GroupNode};
use crate::view::{
    flatten_nodes, DataMatrix, FieldPath, HeaderNode, NodeHeader, PivotResult, ALL_ROWS_KEY,
    ALL_ROWS_LABEL, GRAND_TOTAL_COLS_KEY, GRAND_TOTAL_LABEL, GRAND_TOTAL_ROWS_KEY, SUBTOTAL_SUFFIX,
    VALUES_COLUMN_KEY, VALUES_COLUMN_LABEL,
};

// ============================================================================
// AXIS LAYOUT
// ============================================================================

/// A slot whose intersections carry cells.
#[derive(Debug, Clone)]
struct DataSlot {
    slot: usize,
    /// Ascending indices of the rows behind the slot.
    rows: Vec<RowIndex>,
    /// Leaves covered by the slot, by leaf ordinal.
    leaves: Range<usize>,
}

/// One axis of the result: header tree, key list and the data slots.
#[derive(Debug, Default)]
struct Axis {
    keys: Vec<String>,
    roots: Vec<HeaderNode>,
    data_slots: Vec<DataSlot>,
    leaf_count: usize,
    /// Leaf ordinal of each source row, `None` for rows outside the axis.
    leaf_of_row: Vec<Option<usize>>,
}

impl Axis {
    fn leaf_of(&self, row: RowIndex) -> Option<usize> {
        self.leaf_of_row.get(row).copied().flatten()
    }
}

struct AxisBuilder {
    axis: Axis,
    show_subtotals: bool,
}

impl AxisBuilder {
    fn new(row_count: usize, show_subtotals: bool) -> Self {
        AxisBuilder {
            axis: Axis {
                leaf_of_row: vec![None; row_count],
                ..Axis::default()
            },
            show_subtotals,
        }
    }

    fn next_slot(&mut self, key: String) -> usize {
        self.axis.keys.push(key);
        self.axis.keys.len() - 1
    }

    fn push_leaf(&mut self, slot: usize, rows: Vec<RowIndex>) {
        let leaf = self.axis.leaf_count;
        for &row in &rows {
            self.axis.leaf_of_row[row] = Some(leaf);
        }
        self.axis.data_slots.push(DataSlot {
            slot,
            rows,
            leaves: leaf..leaf + 1,
        });
        self.axis.leaf_count += 1;
    }

    /// Lays out a level of groups. Each inner group is followed by its
    /// subtotal slot; the subtotal header is only added when shown.
    fn push_groups(&mut self, groups: Vec<GroupNode>) -> Vec<HeaderNode> {
        let mut nodes = Vec::with_capacity(groups.len());

        for group in groups {
            let key = group.key();
            let slot = self.next_slot(key.clone());
            let header = NodeHeader {
                key,
                label: group.label,
                level: group.level,
                original_values: group.path,
                slot,
            };

            if group.children.is_empty() {
                self.push_leaf(slot, group.rows);
                nodes.push(HeaderNode::Group {
                    header,
                    children: Vec::new(),
                });
                continue;
            }

            let first_leaf = self.axis.leaf_count;
            let children = self.push_groups(group.children);

            let subtotal_key = format!("{}{}", header.key, SUBTOTAL_SUFFIX);
            let subtotal_slot = self.next_slot(subtotal_key.clone());
            self.axis.data_slots.push(DataSlot {
                slot: subtotal_slot,
                rows: group.rows,
                leaves: first_leaf..self.axis.leaf_count,
            });

            let subtotal = self.show_subtotals.then(|| HeaderNode::Subtotal {
                header: NodeHeader {
                    key: subtotal_key,
                    label: format!("Subtotal {}", header.label),
                    level: header.level,
                    original_values: header.original_values.clone(),
                    slot: subtotal_slot,
                },
            });

            nodes.push(HeaderNode::Group { header, children });
            nodes.extend(subtotal);
        }

        nodes
    }

    /// Adds a root-level synthetic leaf covering `rows`.
    fn push_synthetic_leaf(&mut self, key: &str, label: &str, rows: &[RowIndex]) {
        let slot = self.next_slot(key.to_string());
        self.push_leaf(slot, rows.to_vec());
        self.axis.roots.push(HeaderNode::Group {
            header: synthetic_header(key, label, slot),
            children: Vec::new(),
        });
    }

    /// Adds the root-level grand total covering `rows`.
    fn push_grand_total(&mut self, key: &str, rows: &[RowIndex]) {
        let slot = self.next_slot(key.to_string());
        self.axis.data_slots.push(DataSlot {
            slot,
            rows: rows.to_vec(),
            leaves: 0..self.axis.leaf_count,
        });
        self.axis.roots.push(HeaderNode::GrandTotal {
            header: synthetic_header(key, GRAND_TOTAL_LABEL, slot),
        });
    }

    fn finish(self) -> Axis {
        self.axis
    }
}

fn synthetic_header(key: &str, label: &str, slot: usize) -> NodeHeader {
    NodeHeader {
        key: key.to_string(),
        label: label.to_string(),
        level: 0,
        original_values: FieldPath::new(),
        slot,
    }
}

/// Which synthetic nodes an axis receives.
struct AxisShape<'a> {
    fields: &'a [String],
    show_subtotals: bool,
    /// Key and label of the leaf used when `fields` is empty.
    placeholder: Option<(&'static str, &'static str)>,
    grand_total: Option<&'static str>,
}

fn build_axis(table: &Table, rows: &[RowIndex], shape: &AxisShape<'_>) -> Axis {
    let mut builder = AxisBuilder::new(table.len(), shape.show_subtotals);

    if shape.fields.is_empty() {
        if let Some((key, label)) = shape.placeholder {
            builder.push_synthetic_leaf(key, label, rows);
        }
    } else {
        let fields = AxisField::resolve(table, shape.fields);
        let groups = group_rows(table, rows, &fields, 0, &FieldPath::new());
        let roots = builder.push_groups(groups);
        builder.axis.roots = roots;
    }

    if let Some(key) = shape.grand_total {
        builder.push_grand_total(key, rows);
    }

    builder.finish()
}

// ============================================================================
// PIVOT CALCULATION
// ============================================================================

/// Computes the pivot of `table` described by `config`.
///
/// Returns `None` when the table is empty or the configuration has nothing
/// to display. When the filters remove every row, the header trees are built
/// from the unfiltered table and the matrix is empty.
pub fn calculate_pivot(
    table: &Table,
    config: &PivotConfig,
    options: &DisplayOptions,
) -> Option<PivotResult> {
    if table.is_empty() || config.is_empty() {
        return None;
    }

    log::info!(
        target: "pivot",
        "calculating pivot: {} source rows, {} row fields, {} column fields, {} measures",
        table.len(),
        config.row_fields.len(),
        config.column_fields.len(),
        config.measure_count()
    );

    let filtered = apply_filters(table, &config.filters);
    let headers_only = filtered.is_empty();
    let axis_rows: RowSet = if headers_only {
        log::debug!(target: "pivot", "filters removed every row; building headers from the source table");
        all_rows(table)
    } else {
        filtered
    };

    let has_measures = config.has_measures();

    let row_axis = build_axis(
        table,
        &axis_rows,
        &AxisShape {
            fields: &config.row_fields,
            show_subtotals: options.show_row_subtotals,
            placeholder: has_measures.then_some((ALL_ROWS_KEY, ALL_ROWS_LABEL)),
            grand_total: (options.show_row_grand_totals && !config.row_fields.is_empty())
                .then_some(GRAND_TOTAL_ROWS_KEY),
        },
    );
    let column_axis = build_axis(
        table,
        &axis_rows,
        &AxisShape {
            fields: &config.column_fields,
            show_subtotals: options.show_column_subtotals,
            placeholder: has_measures.then_some((VALUES_COLUMN_KEY, VALUES_COLUMN_LABEL)),
            grand_total: (options.show_column_grand_totals && has_measures)
                .then_some(GRAND_TOTAL_COLS_KEY),
        },
    );

    let plan = MeasurePlan::new(table, config);
    let data_matrix = if headers_only || plan.is_empty() {
        DataMatrix::new()
    } else {
        cross_tabulate(table, &plan, &row_axis, &column_axis)
    };

    log::info!(
        target: "pivot",
        "pivot calculated: {} row keys, {} column keys, {} cells",
        row_axis.keys.len(),
        column_axis.keys.len(),
        data_matrix.len()
    );

    Some(PivotResult {
        row_headers: row_axis.roots,
        column_headers: column_axis.roots,
        data_matrix,
        all_row_keys: row_axis.keys,
        all_column_keys: column_axis.keys,
        measure_keys: plan.keys().to_vec(),
    })
}

/// Fills the matrix for every pair of data slots sharing at least one row.
fn cross_tabulate(table: &Table, plan: &MeasurePlan, rows: &Axis, columns: &Axis) -> DataMatrix {
    let mut matrix = DataMatrix::new();

    for row_slot in &rows.data_slots {
        let mut buckets: Vec<Vec<RowIndex>> = vec![Vec::new(); columns.leaf_count];
        for &row in &row_slot.rows {
            if let Some(leaf) = columns.leaf_of(row) {
                buckets[leaf].push(row);
            }
        }

        for column_slot in &columns.data_slots {
            let shared: Cow<'_, [RowIndex]> = if column_slot.leaves.len() == 1 {
                Cow::Borrowed(&buckets[column_slot.leaves.start])
            } else if column_slot.leaves == (0..columns.leaf_count) {
                Cow::Borrowed(&row_slot.rows)
            } else {
                Cow::Owned(
                    row_slot
                        .rows
                        .iter()
                        .copied()
                        .filter(|&row| {
                            columns
                                .leaf_of(row)
                                .is_some_and(|leaf| column_slot.leaves.contains(&leaf))
                        })
                        .collect(),
                )
            };

            if shared.is_empty() {
                continue;
            }
            matrix.insert(row_slot.slot, column_slot.slot, plan.aggregate(table, &shared));
        }
    }

    matrix
}

// ============================================================================
// DRILL DOWN
// ============================================================================

/// Returns the source row indices behind one cell of `result`.
///
/// Rows are the filtered rows matching both nodes' `original_values`; grand
/// totals and synthetic nodes match every filtered row. Unknown keys give
/// no rows.
pub fn drill_down(
    table: &Table,
    config: &PivotConfig,
    result: &PivotResult,
    row_key: &str,
    column_key: &str,
) -> Vec<RowIndex> {
    let (Some(row_node), Some(column_node)) = (
        find_node(&result.row_headers, &result.all_row_keys, row_key),
        find_node(&result.column_headers, &result.all_column_keys, column_key),
    ) else {
        return Vec::new();
    };

    let criteria: Vec<(Option<usize>, &str)> = row_node
        .iter()
        .chain(column_node.iter())
        .map(|(field, value)| (table.field_index(field), value.as_str()))
        .collect();

    apply_filters(table, &config.filters)
        .into_iter()
        .filter(|&row| {
            criteria
                .iter()
                .all(|(field, value)| group_label(table.value_opt(row, *field)) == *value)
        })
        .collect()
}

/// Resolves a key to the field values it stands for. Subtotal keys resolve
/// through their group, which also covers subtotals hidden from the tree.
fn find_node(nodes: &[HeaderNode], keys: &[String], key: &str) -> Option<FieldPath> {
    if !keys.iter().any(|k| k == key) {
        return None;
    }
    let group_key = key.strip_suffix(SUBTOTAL_SUFFIX).unwrap_or(key);
    flatten_nodes(nodes)
        .into_iter()
        .find(|n| n.key() == group_key)
        .map(|n| n.header().original_values.clone())
}

// ============================================================================
// FORMULA VALIDATION
// ============================================================================

/// Validates a calculated-measure formula at configuration time.
pub fn validate_formula(formula: &str) -> Result<(), ParseError> {
    parser::parse(formula).map(|_| ())
}

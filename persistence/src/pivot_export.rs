//! FILENAME: persistence/src/pivot_export.rs
//! Pivot export layout.
//!
//! Flattens a `PivotResult` into a plain 2-D sheet: one header row per
//! column-tree level, one row naming the measure of every data column, then
//! one row per visible row node. The layout is computed without touching the
//! xlsx writer so the structure can be checked on its own.

use pivot_engine::{
    flatten_nodes, tree_depth, DisplayOptions, HeaderNode, PivotConfig, PivotResult,
};

/// One cell of the exported sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportCell {
    Empty,
    Text(String),
    Number(f64),
}

impl ExportCell {
    pub fn text(s: impl Into<String>) -> Self {
        ExportCell::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ExportCell::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ExportCell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ExportCell::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// A horizontal run of header cells shown as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRange {
    pub row: usize,
    pub first_column: usize,
    pub last_column: usize,
}

/// What a sheet row shows, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Header,
    Group,
    Subtotal,
    GrandTotal,
}

/// The full layout of an exported pivot.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSheet {
    pub name: String,
    /// Every row has `width()` cells.
    pub rows: Vec<Vec<ExportCell>>,
    pub row_kinds: Vec<RowKind>,
    pub merges: Vec<MergeRange>,
    /// Rows above the data: column-level rows plus the measure-name row.
    pub header_rows: usize,
    /// Leading columns holding row labels.
    pub label_columns: usize,
}

impl ExportSheet {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn cell(&self, row: usize, column: usize) -> &ExportCell {
        static EMPTY: ExportCell = ExportCell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }

    /// Rows below the header block.
    pub fn data_rows(&self) -> &[Vec<ExportCell>] {
        &self.rows[self.header_rows.min(self.rows.len())..]
    }
}

/// Whether a node is shown under `options` on the given axis.
fn is_visible(node: &HeaderNode, show_subtotals: bool, show_grand_totals: bool) -> bool {
    match node {
        HeaderNode::Group { .. } => true,
        HeaderNode::Subtotal { .. } => show_subtotals,
        HeaderNode::GrandTotal { .. } => show_grand_totals,
    }
}

/// Lays out `result` as a sheet.
///
/// Subtotal and grand-total nodes hidden by `options` are left out on both
/// axes, as headers and as data.
pub fn build_export_sheet(
    result: &PivotResult,
    config: &PivotConfig,
    options: &DisplayOptions,
) -> ExportSheet {
    let measure_count = result.measure_keys.len();

    let column_nodes: Vec<&HeaderNode> = flatten_nodes(&result.column_headers)
        .into_iter()
        .filter(|n| is_visible(n, options.show_column_subtotals, options.show_column_grand_totals))
        .collect();
    let data_columns: Vec<&HeaderNode> = if measure_count == 0 {
        Vec::new()
    } else {
        column_nodes
            .iter()
            .copied()
            .filter(|n| n.carries_data())
            .collect()
    };
    let row_nodes: Vec<&HeaderNode> = flatten_nodes(&result.row_headers)
        .into_iter()
        .filter(|n| is_visible(n, options.show_row_subtotals, options.show_row_grand_totals))
        .collect();

    let label_columns = tree_depth(&result.row_headers).max(1);
    let column_levels = if measure_count == 0 {
        0
    } else {
        tree_depth(&result.column_headers)
    };
    let header_rows = column_levels + 1;
    let width = label_columns + data_columns.len() * measure_count;

    let mut rows = vec![vec![ExportCell::Empty; width]; header_rows];
    let mut row_kinds = vec![RowKind::Header; header_rows];
    let mut merges = Vec::new();

    // Column headers: inner groups take one cell above their first child,
    // data columns span one cell per measure.
    if measure_count > 0 {
        let mut next_column = label_columns;
        for node in &column_nodes {
            let level = node.level().min(column_levels.saturating_sub(1));
            rows[level][next_column] = ExportCell::text(node.label());
            if !node.carries_data() {
                continue;
            }
            if measure_count > 1 {
                merges.push(MergeRange {
                    row: level,
                    first_column: next_column,
                    last_column: next_column + measure_count - 1,
                });
            }
            next_column += measure_count;
        }
    }

    // Measure-name row, with the row field names over the label columns.
    let measure_row = header_rows - 1;
    for (i, field) in config.row_fields.iter().take(label_columns).enumerate() {
        rows[measure_row][i] = ExportCell::text(field.as_str());
    }
    for (c, _) in data_columns.iter().enumerate() {
        for (m, key) in result.measure_keys.iter().enumerate() {
            rows[measure_row][label_columns + c * measure_count + m] = ExportCell::text(key.as_str());
        }
    }

    for node in &row_nodes {
        let mut row = vec![ExportCell::Empty; width];
        row[node.level().min(label_columns - 1)] = ExportCell::text(node.label());

        if node.carries_data() {
            for (c, column) in data_columns.iter().enumerate() {
                let Some(cell) = result.data_matrix.get(node.slot(), column.slot()) else {
                    continue;
                };
                for m in 0..measure_count {
                    if let Some(value) = cell.value_at(m) {
                        row[label_columns + c * measure_count + m] = ExportCell::Number(value);
                    }
                }
            }
        }

        rows.push(row);
        row_kinds.push(match node {
            HeaderNode::Group { .. } => RowKind::Group,
            HeaderNode::Subtotal { .. } => RowKind::Subtotal,
            HeaderNode::GrandTotal { .. } => RowKind::GrandTotal,
        });
    }

    ExportSheet {
        name: "Pivot".to_string(),
        rows,
        row_kinds,
        merges,
        header_rows,
        label_columns,
    }
}

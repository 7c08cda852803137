//! FILENAME: pivot-engine/src/view.rs
//! Pivot View - The computed result handed to renderers and exporters.
//!
//! A result is two header trees (rows and columns) plus a sparse matrix of
//! cells. Every header node owns a `slot`, its position in the flat key list
//! of its axis; the matrix is addressed by `(row_slot, column_slot)`. The
//! string keys remain available for presentation and for lookups by key.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use smallvec::SmallVec;

/// Fixed key of the grand-total row.
pub const GRAND_TOTAL_ROWS_KEY: &str = "GRANDTOTAL_ROWS";
/// Fixed key of the grand-total column.
pub const GRAND_TOTAL_COLS_KEY: &str = "GRANDTOTAL_COLS";
/// Suffix appended to a group key to form its subtotal key.
pub const SUBTOTAL_SUFFIX: &str = "|-|SUBTOTAL";
/// Key of the synthetic column used when no column fields are configured.
pub const VALUES_COLUMN_KEY: &str = "VALUES";
/// Key of the synthetic row used when no row fields are configured.
pub const ALL_ROWS_KEY: &str = "ALL_ROWS";

pub const GRAND_TOTAL_LABEL: &str = "Grand Total";
pub const VALUES_COLUMN_LABEL: &str = "Values";
pub const ALL_ROWS_LABEL: &str = "Total";
/// Label used for groups whose field value is null or missing.
pub const NULL_GROUP_LABEL: &str = "N/A";

/// Accumulated `(field, value label)` pairs from the root to a node.
pub type FieldPath = SmallVec<[(String, String); 4]>;

// ============================================================================
// HEADER TREE
// ============================================================================

/// Fields shared by every kind of header node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHeader {
    /// Canonical key: sorted `field:value` pairs joined with `|`.
    pub key: String,
    pub label: String,
    /// 0-based depth; the index of the producing field for groups.
    pub level: usize,
    /// Field values identifying the rows behind this node. Empty for
    /// grand totals and the synthetic Values/Total nodes.
    pub original_values: FieldPath,
    /// Index into the axis key list and matrix coordinate.
    pub slot: usize,
}

/// A row or column header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum HeaderNode {
    /// A distinct value of one dimension field. Leaves have no children.
    Group {
        header: NodeHeader,
        children: Vec<HeaderNode>,
    },
    /// Totals over the rows of the group placed just before it.
    Subtotal { header: NodeHeader },
    /// Totals over the whole axis.
    GrandTotal { header: NodeHeader },
}

impl HeaderNode {
    pub fn header(&self) -> &NodeHeader {
        match self {
            HeaderNode::Group { header, .. }
            | HeaderNode::Subtotal { header }
            | HeaderNode::GrandTotal { header } => header,
        }
    }

    pub fn key(&self) -> &str {
        &self.header().key
    }

    pub fn label(&self) -> &str {
        &self.header().label
    }

    pub fn level(&self) -> usize {
        self.header().level
    }

    pub fn slot(&self) -> usize {
        self.header().slot
    }

    pub fn children(&self) -> &[HeaderNode] {
        match self {
            HeaderNode::Group { children, .. } => children,
            _ => &[],
        }
    }

    /// A group without children; the finest grouping on its axis.
    pub fn is_leaf(&self) -> bool {
        matches!(self, HeaderNode::Group { children, .. } if children.is_empty())
    }

    pub fn is_subtotal(&self) -> bool {
        matches!(self, HeaderNode::Subtotal { .. })
    }

    pub fn is_grand_total(&self) -> bool {
        matches!(self, HeaderNode::GrandTotal { .. })
    }

    /// True for nodes whose intersections carry matrix cells: leaves,
    /// subtotals and grand totals. Inner groups only label their subtree.
    pub fn carries_data(&self) -> bool {
        !matches!(self, HeaderNode::Group { children, .. } if !children.is_empty())
    }
}

/// Depth-first, pre-order list of every node in `nodes`.
pub fn flatten_nodes(nodes: &[HeaderNode]) -> Vec<&HeaderNode> {
    fn walk<'a>(nodes: &'a [HeaderNode], out: &mut Vec<&'a HeaderNode>) {
        for node in nodes {
            out.push(node);
            walk(node.children(), out);
        }
    }

    let mut out = Vec::new();
    walk(nodes, &mut out);
    out
}

/// Nodes carrying data, in display order.
pub fn data_nodes(nodes: &[HeaderNode]) -> Vec<&HeaderNode> {
    flatten_nodes(nodes)
        .into_iter()
        .filter(|n| n.carries_data())
        .collect()
}

/// Number of nesting levels in a header tree.
pub fn tree_depth(nodes: &[HeaderNode]) -> usize {
    nodes
        .iter()
        .map(|n| 1 + tree_depth(n.children()))
        .max()
        .unwrap_or(0)
}

// ============================================================================
// CELLS
// ============================================================================

/// The aggregated measures at one row/column intersection.
///
/// Measure keys are shared by every cell of a result; values are positional.
/// `None` means the measure has no value here (e.g. AVERAGE of no numbers
/// or a calculated measure that could not be evaluated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    measures: Arc<[String]>,
    values: SmallVec<[Option<f64>; 4]>,
}

impl Cell {
    pub fn new(measures: Arc<[String]>, values: SmallVec<[Option<f64>; 4]>) -> Self {
        debug_assert_eq!(measures.len(), values.len());
        Cell { measures, values }
    }

    /// Value of a measure by key. `None` for null values and unknown keys.
    pub fn get(&self, measure_key: &str) -> Option<f64> {
        self.measures
            .iter()
            .position(|m| m == measure_key)
            .and_then(|i| self.value_at(i))
    }

    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn contains(&self, measure_key: &str) -> bool {
        self.measures.iter().any(|m| m == measure_key)
    }

    pub fn measure_keys(&self) -> &[String] {
        &self.measures
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.measures
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

// ============================================================================
// DATA MATRIX
// ============================================================================

/// Sparse `(row_slot, column_slot) -> Cell` table. A missing entry means no
/// source rows fall in that intersection, which is not the same as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataMatrix {
    cells: FxHashMap<(usize, usize), Cell>,
}

impl DataMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, row_slot: usize, column_slot: usize, cell: Cell) {
        self.cells.insert((row_slot, column_slot), cell);
    }

    pub fn get(&self, row_slot: usize, column_slot: usize) -> Option<&Cell> {
        self.cells.get(&(row_slot, column_slot))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &Cell)> {
        self.cells.iter().map(|(coord, cell)| (*coord, cell))
    }
}

#[derive(Serialize)]
struct MatrixEntry<'a> {
    row: usize,
    column: usize,
    cell: &'a Cell,
}

impl Serialize for DataMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<_> = self.cells.iter().collect();
        entries.sort_unstable_by_key(|(coord, _)| **coord);

        let mut seq = serializer.serialize_seq(Some(entries.len()))?;
        for (&(row, column), cell) in entries {
            seq.serialize_element(&MatrixEntry { row, column, cell })?;
        }
        seq.end()
    }
}

// ============================================================================
// PIVOT RESULT
// ============================================================================

/// The complete output of one pivot computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotResult {
    pub row_headers: Vec<HeaderNode>,
    pub column_headers: Vec<HeaderNode>,
    pub data_matrix: DataMatrix,
    /// Every row key by slot, including subtotal keys hidden by the
    /// display options.
    pub all_row_keys: Vec<String>,
    /// Every column key by slot, including hidden subtotal keys.
    pub all_column_keys: Vec<String>,
    /// Measure keys in cell order.
    pub measure_keys: Vec<String>,
}

impl PivotResult {
    pub fn row_slot(&self, key: &str) -> Option<usize> {
        self.all_row_keys.iter().position(|k| k == key)
    }

    pub fn column_slot(&self, key: &str) -> Option<usize> {
        self.all_column_keys.iter().position(|k| k == key)
    }

    /// Looks up a cell by row and column key.
    pub fn cell(&self, row_key: &str, column_key: &str) -> Option<&Cell> {
        let row = self.row_slot(row_key)?;
        let column = self.column_slot(column_key)?;
        self.data_matrix.get(row, column)
    }

    /// Looks up one measure of one cell by keys.
    pub fn value(&self, row_key: &str, column_key: &str, measure_key: &str) -> Option<f64> {
        self.cell(row_key, column_key)?.get(measure_key)
    }

    /// Visible row nodes carrying data, in display order.
    pub fn data_rows(&self) -> Vec<&HeaderNode> {
        data_nodes(&self.row_headers)
    }

    /// Visible column nodes carrying data, in display order.
    pub fn data_columns(&self) -> Vec<&HeaderNode> {
        data_nodes(&self.column_headers)
    }

    pub fn find_row(&self, key: &str) -> Option<&HeaderNode> {
        flatten_nodes(&self.row_headers)
            .into_iter()
            .find(|n| n.key() == key)
    }

    pub fn find_column(&self, key: &str) -> Option<&HeaderNode> {
        flatten_nodes(&self.column_headers)
            .into_iter()
            .find(|n| n.key() == key)
    }

    pub fn row_depth(&self) -> usize {
        tree_depth(&self.row_headers)
    }

    pub fn column_depth(&self) -> usize {
        tree_depth(&self.column_headers)
    }
}

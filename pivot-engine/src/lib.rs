//! FILENAME: pivot-engine/src/lib.rs
//! Pivot aggregation engine.
//!
//! Turns a flat `engine::Table` into a cross-tabulation with hierarchical
//! row and column grouping, multiple measures, calculated measures,
//! subtotals and grand totals.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the pivot IS)
//! - `filter`: Pre-aggregation filter stage
//! - `tree`: Hierarchy builder (rows grouped per dimension field)
//! - `aggregate`: Cell aggregator and calculated measures
//! - `engine`: Matrix assembler, drill-down and formula validation
//! - `view`: Result types (header trees, cells, sparse matrix)
//! - `session`: Generation-tagged recomputation and multi-view calculation

pub mod aggregate;
pub mod definition;
pub mod engine;
pub mod filter;
pub mod session;
pub mod tree;
pub mod view;

pub use aggregate::{aggregate, round2, suggest_aggregation, AggregateAccumulator, MeasurePlan};
pub use definition::*;
pub use self::engine::{calculate_pivot, drill_down, validate_formula};
pub use filter::{all_rows, apply_filters, RowSet, NULL_FILTER_TOKENS};
pub use session::{calculate_views, Generation, PivotRequest, PivotSession};
pub use tree::{build_tree, compare_labels, group_label, node_key};
pub use view::*;

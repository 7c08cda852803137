//! FILENAME: pivot-engine/src/definition.rs
//! Pivot Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a pivot:
//! which fields group the rows and columns, which fields are aggregated
//! and how, the calculated measures, the pre-aggregation filters, and the
//! display options. These structures are:
//! - Serializable (loaded from JSON by the host)
//! - Immutable snapshots of user intent for one computation

use serde::{Deserialize, Serialize};

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for value fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationType {
    #[default]
    Sum,
    Average,
    Count,
    CountNonEmpty,
    Min,
    Max,
    UniqueCount,
    /// Sample standard deviation (n - 1).
    #[serde(rename = "STDEV")]
    StdDev,
}

impl AggregationType {
    pub const ALL: [AggregationType; 8] = [
        AggregationType::Sum,
        AggregationType::Average,
        AggregationType::Count,
        AggregationType::CountNonEmpty,
        AggregationType::Min,
        AggregationType::Max,
        AggregationType::UniqueCount,
        AggregationType::StdDev,
    ];

    /// The upper-case name used in measure keys and formula references.
    pub fn name(self) -> &'static str {
        match self {
            AggregationType::Sum => "SUM",
            AggregationType::Average => "AVERAGE",
            AggregationType::Count => "COUNT",
            AggregationType::CountNonEmpty => "COUNT_NON_EMPTY",
            AggregationType::Min => "MIN",
            AggregationType::Max => "MAX",
            AggregationType::UniqueCount => "UNIQUE_COUNT",
            AggregationType::StdDev => "STDEV",
        }
    }

    /// Looks up an aggregation by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|agg| agg.name().eq_ignore_ascii_case(name))
    }

    /// Whether the aggregation only looks at values that parse as numbers.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            AggregationType::Sum
                | AggregationType::Average
                | AggregationType::Min
                | AggregationType::Max
                | AggregationType::StdDev
        )
    }
}

impl std::fmt::Display for AggregationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// MEASURES
// ============================================================================

/// A field in the Values area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueField {
    /// Name of the source field to aggregate.
    pub field: String,

    #[serde(default)]
    pub aggregation: AggregationType,
}

impl ValueField {
    pub fn new(field: impl Into<String>, aggregation: AggregationType) -> Self {
        ValueField {
            field: field.into(),
            aggregation,
        }
    }

    /// Key of this measure inside a cell, e.g. `"Sales (SUM)"`.
    pub fn measure_key(&self) -> String {
        format!("{} ({})", self.field, self.aggregation.name())
    }
}

/// A measure computed from a formula over the other measures of a cell,
/// e.g. `[SUM(Sales)] - [SUM(Cost)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedMeasure {
    /// Unique name; also the measure key inside a cell.
    pub name: String,
    pub formula: String,
}

impl CalculatedMeasure {
    pub fn new(name: impl Into<String>, formula: impl Into<String>) -> Self {
        CalculatedMeasure {
            name: name.into(),
            formula: formula.into(),
        }
    }
}

// ============================================================================
// FILTERS
// ============================================================================

/// Pre-aggregation filter: keeps rows whose field value, coerced to a
/// string, is one of `allowed_values`. An empty set keeps every row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,

    #[serde(default)]
    pub allowed_values: Vec<String>,
}

impl FieldFilter {
    pub fn new<I, S>(field: impl Into<String>, allowed_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldFilter {
            field: field.into(),
            allowed_values: allowed_values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_restrictive(&self) -> bool {
        !self.allowed_values.is_empty()
    }
}

// ============================================================================
// PIVOT CONFIGURATION
// ============================================================================

/// The complete pivot configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PivotConfig {
    /// Fields in the Rows area (outermost first).
    #[serde(default)]
    pub row_fields: Vec<String>,

    /// Fields in the Columns area (outermost first).
    #[serde(default)]
    pub column_fields: Vec<String>,

    #[serde(default)]
    pub value_fields: Vec<ValueField>,

    #[serde(default)]
    pub calculated_measures: Vec<CalculatedMeasure>,

    #[serde(default)]
    pub filters: Vec<FieldFilter>,
}

impl PivotConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_row_field(mut self, field: impl Into<String>) -> Self {
        self.row_fields.push(field.into());
        self
    }

    pub fn with_column_field(mut self, field: impl Into<String>) -> Self {
        self.column_fields.push(field.into());
        self
    }

    pub fn with_value(mut self, field: impl Into<String>, aggregation: AggregationType) -> Self {
        self.value_fields.push(ValueField::new(field, aggregation));
        self
    }

    pub fn with_calculated(mut self, name: impl Into<String>, formula: impl Into<String>) -> Self {
        self.calculated_measures
            .push(CalculatedMeasure::new(name, formula));
        self
    }

    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Number of measures per cell (value fields plus calculated measures).
    pub fn measure_count(&self) -> usize {
        self.value_fields.len() + self.calculated_measures.len()
    }

    pub fn has_measures(&self) -> bool {
        self.measure_count() > 0
    }

    /// True when there is nothing to display: no row fields, no column
    /// fields and no measures.
    pub fn is_empty(&self) -> bool {
        self.row_fields.is_empty() && self.column_fields.is_empty() && !self.has_measures()
    }

    /// Measure keys in cell order: value fields first, then calculated measures.
    pub fn measure_keys(&self) -> Vec<String> {
        self.value_fields
            .iter()
            .map(ValueField::measure_key)
            .chain(self.calculated_measures.iter().map(|m| m.name.clone()))
            .collect()
    }
}

// ============================================================================
// DISPLAY OPTIONS
// ============================================================================

/// Totals visibility and presentation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayOptions {
    #[serde(default = "default_true")]
    pub show_row_grand_totals: bool,

    #[serde(default = "default_true")]
    pub show_column_grand_totals: bool,

    #[serde(default = "default_true")]
    pub show_row_subtotals: bool,

    #[serde(default = "default_true")]
    pub show_column_subtotals: bool,

    /// Presentation only: the engine never reads it.
    #[serde(default)]
    pub collapse_rows_by_default: bool,

    /// Presentation only: the engine never reads it.
    #[serde(default)]
    pub collapse_columns_by_default: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            show_row_grand_totals: true,
            show_column_grand_totals: true,
            show_row_subtotals: true,
            show_column_subtotals: true,
            collapse_rows_by_default: false,
            collapse_columns_by_default: false,
        }
    }
}

impl DisplayOptions {
    /// Grand totals on both axes, no subtotals.
    pub fn grand_totals_only() -> Self {
        DisplayOptions {
            show_row_subtotals: false,
            show_column_subtotals: false,
            ..Self::default()
        }
    }

    /// No totals of any kind.
    pub fn no_totals() -> Self {
        DisplayOptions {
            show_row_grand_totals: false,
            show_column_grand_totals: false,
            show_row_subtotals: false,
            show_column_subtotals: false,
            ..Self::default()
        }
    }
}

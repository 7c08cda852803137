//! FILENAME: pivot-engine/src/aggregate.rs
//! Cell aggregator.
//!
//! Reduces a row subset into one `Cell`: first every value field through an
//! `AggregateAccumulator`, then every calculated measure by evaluating its
//! formula against the values just produced. Rounding to two decimals is
//! applied to final values only.

use std::sync::Arc;

use engine::{evaluate, CellValue, FieldIndex, MeasureRef, Resolution, RowIndex, Table};
use parser::{parse, Expression};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::definition::{AggregationType, PivotConfig};
use crate::view::Cell;

// ============================================================================
// AGGREGATE ACCUMULATOR
// ============================================================================

/// Accumulator for computing one aggregate incrementally.
/// Stores the intermediate state needed for every aggregation type.
#[derive(Debug, Clone, Default)]
pub struct AggregateAccumulator {
    /// Every row seen, whatever its value.
    pub count: u64,
    /// Rows whose value is neither null nor the empty string.
    pub count_non_empty: u64,
    pub count_numbers: u64,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Welford's running mean and sum of squared differences.
    pub mean: f64,
    pub m2: f64,
    /// Distinct display strings; only tracked for UNIQUE_COUNT.
    pub distinct: Option<FxHashSet<String>>,
}

impl AggregateAccumulator {
    pub fn new(aggregation: AggregationType) -> Self {
        AggregateAccumulator {
            distinct: (aggregation == AggregationType::UniqueCount).then(FxHashSet::default),
            ..Default::default()
        }
    }

    /// Adds one raw source value.
    pub fn add(&mut self, value: &CellValue) {
        self.count += 1;

        if value.is_blank() {
            return;
        }
        self.count_non_empty += 1;

        if let Some(distinct) = self.distinct.as_mut() {
            distinct.insert(value.display_value());
        }
        if let Some(n) = value.as_number() {
            self.add_number(n);
        }
    }

    fn add_number(&mut self, value: f64) {
        self.count_numbers += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));

        let delta = value - self.mean;
        self.mean += delta / (self.count_numbers as f64);
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Computes the final, unrounded aggregate.
    pub fn compute(&self, aggregation: AggregationType) -> Option<f64> {
        match aggregation {
            AggregationType::Sum => Some(self.sum),
            AggregationType::Count => Some(self.count as f64),
            AggregationType::CountNonEmpty => Some(self.count_non_empty as f64),
            AggregationType::UniqueCount => {
                Some(self.distinct.as_ref().map_or(0, |d| d.len()) as f64)
            }
            AggregationType::Average => {
                (self.count_numbers > 0).then(|| self.sum / self.count_numbers as f64)
            }
            AggregationType::Min => self.min,
            AggregationType::Max => self.max,
            AggregationType::StdDev => (self.count_numbers > 1)
                .then(|| (self.m2 / (self.count_numbers - 1) as f64).sqrt()),
        }
    }
}

/// Rounds half away from zero to two decimals. Negative zero becomes zero.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

// ============================================================================
// MEASURE PLAN
// ============================================================================

#[derive(Debug, Clone)]
struct BaseMeasure {
    field_name: String,
    field: Option<FieldIndex>,
    aggregation: AggregationType,
}

#[derive(Debug, Clone)]
struct FormulaMeasure {
    name: String,
    /// `None` when the formula did not parse; the measure is then null
    /// in every cell.
    expression: Option<Expression>,
}

/// Measures of one computation resolved against the source table: field
/// names become indices and formulas are parsed once.
#[derive(Debug, Clone)]
pub struct MeasurePlan {
    keys: Arc<[String]>,
    base: Vec<BaseMeasure>,
    calculated: Vec<FormulaMeasure>,
}

impl MeasurePlan {
    pub fn new(table: &Table, config: &PivotConfig) -> Self {
        let base = config
            .value_fields
            .iter()
            .map(|vf| BaseMeasure {
                field_name: vf.field.clone(),
                field: table.field_index(&vf.field),
                aggregation: vf.aggregation,
            })
            .collect();

        let calculated = config
            .calculated_measures
            .iter()
            .map(|cm| {
                let expression = match parse(&cm.formula) {
                    Ok(expr) => Some(expr),
                    Err(e) => {
                        log::warn!(
                            target: "pivot",
                            "calculated measure '{}' has an invalid formula: {}",
                            cm.name,
                            e
                        );
                        None
                    }
                };
                FormulaMeasure {
                    name: cm.name.clone(),
                    expression,
                }
            })
            .collect();

        MeasurePlan {
            keys: config.measure_keys().into(),
            base,
            calculated,
        }
    }

    pub fn keys(&self) -> &Arc<[String]> {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Aggregates `rows` into a cell holding every measure.
    pub fn aggregate(&self, table: &Table, rows: &[RowIndex]) -> Cell {
        let mut values: SmallVec<[Option<f64>; 4]> = self
            .base
            .iter()
            .map(|measure| {
                let mut acc = AggregateAccumulator::new(measure.aggregation);
                for &row in rows {
                    acc.add(table.value_opt(row, measure.field));
                }
                acc.compute(measure.aggregation).map(round2)
            })
            .collect();

        for formula in &self.calculated {
            let value = self.evaluate_calculated(formula, &values[..self.base.len()]);
            values.push(value);
        }

        Cell::new(self.keys.clone(), values)
    }

    fn evaluate_calculated(&self, formula: &FormulaMeasure, base_values: &[Option<f64>]) -> Option<f64> {
        let expression = formula.expression.as_ref()?;
        let resolver = |measure: &MeasureRef| self.resolve(measure, base_values);

        match evaluate(expression, &resolver) {
            Ok(value) => Some(round2(value)),
            Err(e) => {
                log::debug!(
                    target: "pivot",
                    "calculated measure '{}' evaluated to null: {}",
                    formula.name,
                    e
                );
                None
            }
        }
    }

    /// Finds the value field matching `[AGG(field)]` and reads its value.
    fn resolve(&self, measure: &MeasureRef, base_values: &[Option<f64>]) -> Resolution {
        let position = self.base.iter().position(|b| {
            b.field_name == measure.field && b.aggregation.name() == measure.aggregation
        });

        match position.map(|i| base_values[i]) {
            Some(Some(value)) => Resolution::Value(value),
            Some(None) => Resolution::Missing,
            None => Resolution::Unknown,
        }
    }
}

/// Aggregates `rows` into a cell for every measure in `config`.
pub fn aggregate(table: &Table, rows: &[RowIndex], config: &PivotConfig) -> Cell {
    MeasurePlan::new(table, config).aggregate(table, rows)
}

/// Suggests a default aggregation for a field: SUM when more than half of
/// its non-blank values are numeric under the aggregator's own numeric
/// rule, COUNT_NON_EMPTY otherwise.
pub fn suggest_aggregation(table: &Table, field: &str) -> AggregationType {
    let Some(index) = table.field_index(field) else {
        return AggregationType::CountNonEmpty;
    };

    let mut numeric_count = 0usize;
    let mut total_count = 0usize;
    for row in 0..table.len() {
        let value = table.value(row, index);
        if value.is_blank() {
            continue;
        }
        total_count += 1;
        if value.as_number().is_some() {
            numeric_count += 1;
        }
    }

    if total_count > 0 && (numeric_count as f64 / total_count as f64) > 0.5 {
        AggregationType::Sum
    } else {
        AggregationType::CountNonEmpty
    }
}

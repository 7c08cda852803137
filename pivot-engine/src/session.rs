//! FILENAME: pivot-engine/src/session.rs
//! Recomputation bookkeeping.
//!
//! A pivot is recomputed from scratch on every configuration or source
//! change. Computations may finish out of order when the host runs them off
//! its event loop, so each request is tagged with a generation and only the
//! latest generation may publish its result.
//!
//! Independent views over one table share nothing but the read-only source,
//! so `calculate_views` computes them in parallel when the `parallel`
//! feature is on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use engine::Table;
use serde::{Deserialize, Serialize};

use crate::definition::{DisplayOptions, PivotConfig};
use crate::engine::calculate_pivot;
use crate::view::PivotResult;

/// Monotonic id of one recomputation request.
pub type Generation = u64;

/// Holds the latest published pivot of one view.
#[derive(Debug, Default)]
pub struct PivotSession {
    latest: AtomicU64,
    current: RwLock<Option<Arc<PivotResult>>>,
}

impl PivotSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding every earlier one.
    pub fn begin(&self) -> Generation {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }

    /// Publishes the result of `generation` if no newer request started.
    /// Returns false when the result was discarded as stale.
    pub fn complete(&self, generation: Generation, result: Option<PivotResult>) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(generation) {
            log::debug!(
                target: "pivot",
                "discarding result of generation {} (latest is {})",
                generation,
                self.latest.load(Ordering::SeqCst)
            );
            return false;
        }
        *current = result.map(Arc::new);
        true
    }

    /// The latest published result; `None` before the first completion or
    /// when the latest configuration had nothing to display.
    pub fn current(&self) -> Option<Arc<PivotResult>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs one full recomputation and publishes it if still current.
    pub fn recompute(&self, table: &Table, config: &PivotConfig, options: &DisplayOptions) -> bool {
        let generation = self.begin();
        let result = calculate_pivot(table, config, options);
        self.complete(generation, result)
    }
}

/// One pivot view over a shared table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotRequest {
    #[serde(default)]
    pub config: PivotConfig,
    #[serde(default)]
    pub options: DisplayOptions,
}

impl PivotRequest {
    pub fn new(config: PivotConfig, options: DisplayOptions) -> Self {
        PivotRequest { config, options }
    }
}

/// Computes independent views over one table. Results keep request order.
#[cfg(feature = "parallel")]
pub fn calculate_views(table: &Table, requests: &[PivotRequest]) -> Vec<Option<PivotResult>> {
    use rayon::prelude::*;

    requests
        .par_iter()
        .map(|r| calculate_pivot(table, &r.config, &r.options))
        .collect()
}

/// Computes independent views over one table. Results keep request order.
#[cfg(not(feature = "parallel"))]
pub fn calculate_views(table: &Table, requests: &[PivotRequest]) -> Vec<Option<PivotResult>> {
    requests
        .iter()
        .map(|r| calculate_pivot(table, &r.config, &r.options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::AggregationType;

    fn create_test_table() -> Table {
        Table::from_json_rows(
            r#"[
                {"Region": "North", "Product": "Apples",  "Sales": 100},
                {"Region": "South", "Product": "Oranges", "Sales": 250}
            ]"#,
        )
        .unwrap()
    }

    fn by_region() -> PivotConfig {
        PivotConfig::new()
            .with_row_field("Region")
            .with_value("Sales", AggregationType::Sum)
    }

    #[test]
    fn stale_generations_are_discarded() {
        let table = create_test_table();
        let session = PivotSession::new();

        let first = session.begin();
        let second = session.begin();
        let options = DisplayOptions::default();

        assert!(session.complete(second, calculate_pivot(&table, &by_region(), &options)));
        assert!(!session.complete(first, None));
        assert!(session.current().is_some());
    }

    #[test]
    fn recompute_replaces_the_current_result() {
        let table = create_test_table();
        let session = PivotSession::new();
        let options = DisplayOptions::default();

        assert!(session.recompute(&table, &by_region(), &options));
        assert!(session.current().is_some());

        assert!(session.recompute(&table, &PivotConfig::new(), &options));
        assert!(session.current().is_none());
    }

    #[test]
    fn views_are_independent_and_ordered() {
        let table = create_test_table();
        let requests = vec![
            PivotRequest::new(by_region(), DisplayOptions::default()),
            PivotRequest::default(),
            PivotRequest::new(
                PivotConfig::new()
                    .with_row_field("Product")
                    .with_value("Sales", AggregationType::Max),
                DisplayOptions::no_totals(),
            ),
        ];

        let results = calculate_views(&table, &requests);
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap().value("Region:South", "VALUES", "Sales (SUM)"),
            Some(250.0)
        );
        assert!(results[1].is_none());
        assert_eq!(results[2].as_ref().unwrap().all_column_keys, vec!["VALUES"]);
    }
}

//! Earned value analytics.
//!
//! The pipeline runs leaves first: [`week`] buckets dates, [`plan`] spreads
//! a task's budget over its weeks, [`actual`] buckets approved progress,
//! [`curve`] merges both into a cumulative S-curve, [`hierarchy`] rolls
//! curves up to stages and projects and [`alerts`] inspects the result.
//!
//! [`EvmEngine`] ties the pieces to a store and a configuration.

pub mod actual;
pub mod alerts;
pub mod curve;
pub mod hierarchy;
pub mod plan;
pub mod week;

pub use alerts::{AlertScope, AlertThresholds};

use crate::error::{EvmError, EvmResult};
use crate::models::{AggregatePoint, Alert, SCurvePoint, Task};
use crate::store::EvmStore;
use chrono::NaiveDate;
use tracing::{debug, info};

/// Labor cost per worked hour when nothing else is configured.
pub const DEFAULT_LABOR_RATE: f64 = 20_000.0;

/// Round to `places` decimals.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Monetary amounts carry two decimals.
pub(crate) fn round_money(value: f64) -> f64 {
    round_to(value, 2)
}

/// Ratios and quantities carry three decimals.
pub(crate) fn round_ratio(value: f64) -> f64 {
    round_to(value, 3)
}

/// `numerator / denominator`, or `None` when the denominator is not positive.
pub(crate) fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator > 0.0).then(|| round_ratio(numerator / denominator))
}

/// Engine settings derived from the configuration file and CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Cost charged per approved hour of work.
    pub labor_rate: f64,
    pub thresholds: AlertThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            labor_rate: DEFAULT_LABOR_RATE,
            thresholds: AlertThresholds::default(),
        }
    }
}

impl From<&crate::config::Config> for EngineConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            labor_rate: config.evm.labor_rate,
            thresholds: AlertThresholds::from(&config.alerts),
        }
    }
}

/// Counts from a batch recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecomputeSummary {
    pub plans_generated: usize,
    pub plans_skipped: usize,
    pub actuals_recomputed: usize,
    pub actuals_failed: usize,
}

/// Earned value engine bound to a store.
pub struct EvmEngine<'a, S: EvmStore> {
    store: &'a S,
    config: EngineConfig,
}

impl<'a, S: EvmStore> EvmEngine<'a, S> {
    /// Create an engine over `store`.
    pub fn new(store: &'a S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn task(&self, task_id: &str) -> EvmResult<Task> {
        self.store
            .task(task_id)
            .ok_or_else(|| EvmError::UnknownTask(task_id.to_string()))
    }

    /// Regenerate the task's weekly plan. See [`plan::generate_linear_plan`].
    pub fn generate_linear_plan(&self, task_id: &str) -> bool {
        match self.task(task_id) {
            Ok(task) => plan::generate_linear_plan(self.store, &task),
            Err(_) => false,
        }
    }

    /// Rebuild the task's weekly actuals. See [`actual::recompute_actuals`].
    pub fn recompute_actuals(&self, task_id: &str) -> bool {
        match self.task(task_id) {
            Ok(task) => actual::recompute_actuals(self.store, &task, self.config.labor_rate),
            Err(_) => false,
        }
    }

    /// Regenerate plans and actuals for a set of tasks.
    pub fn recompute_tasks(&self, tasks: &[Task]) -> RecomputeSummary {
        let mut summary = RecomputeSummary::default();
        for task in tasks {
            if plan::generate_linear_plan(self.store, task) {
                summary.plans_generated += 1;
            } else {
                summary.plans_skipped += 1;
            }
            if actual::recompute_actuals(self.store, task, self.config.labor_rate) {
                summary.actuals_recomputed += 1;
            } else {
                summary.actuals_failed += 1;
            }
        }
        info!(
            "Recomputed {} tasks: {} plans generated, {} skipped",
            tasks.len(),
            summary.plans_generated,
            summary.plans_skipped
        );
        summary
    }

    /// Tasks covered by `scope`.
    pub fn tasks_in_scope(&self, scope: &AlertScope) -> EvmResult<Vec<Task>> {
        alerts::tasks_in_scope(self.store, scope)
    }

    /// Cumulative curve of one task.
    pub fn compute_curve(
        &self,
        task_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> EvmResult<Vec<SCurvePoint>> {
        let task = self.task(task_id)?;
        Ok(curve::compute_curve(self.store, &task, from, to))
    }

    /// Cumulative curve of a stage.
    pub fn compute_stage_curve(
        &self,
        stage_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> EvmResult<Vec<AggregatePoint>> {
        hierarchy::compute_stage_curve(self.store, stage_id, from, to)
    }

    /// Cumulative curve of a project.
    pub fn compute_project_curve(
        &self,
        project_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> EvmResult<Vec<AggregatePoint>> {
        hierarchy::compute_project_curve(self.store, project_id, from, to)
    }

    /// Alerts for every trackable task in `scope` as of `today`.
    pub fn detect_alerts(&self, scope: &AlertScope, today: NaiveDate) -> EvmResult<Vec<Alert>> {
        let alerts = alerts::detect_alerts(self.store, scope, today, &self.config.thresholds)?;
        debug!("Detected {} alerts for {:?}", alerts.len(), scope);
        Ok(alerts)
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use crate::models::AlertType;
    use crate::store::WeeklyStore;

    #[test]
    fn test_round_helpers() {
        assert_eq!(round_money(1234.5678), 1234.57);
        assert_eq!(round_ratio(150_000.0 / 140_000.0), 1.071);
        assert_eq!(ratio(1.0, 0.0), None);
        assert_eq!(ratio(3.0, 4.0), Some(0.75));
    }

    #[test]
    fn test_engine_end_to_end() {
        let store = fundaciones_store();
        let engine = EvmEngine::new(&store, EngineConfig::default());

        let summary = engine.recompute_tasks(&[fundaciones()]);
        assert_eq!(summary.plans_generated, 1);
        assert_eq!(summary.actuals_recomputed, 1);
        assert_eq!(store.weekly_plan("fundaciones").len(), 3);

        let curve = engine.compute_curve("fundaciones", None, None).unwrap();
        let last = curve.last().unwrap();
        assert_eq!(last.cumulative_ev, 150_000.0);
        assert_eq!(last.spi, Some(0.5));

        let stage = engine.compute_stage_curve("s-obra", None, None).unwrap();
        assert_eq!(stage.len(), 3);
        assert_eq!(stage[2].cumulative_ac, 140_000.0);

        let alerts = engine
            .detect_alerts(&AlertScope::Project("p-edificio".to_string()), date(2024, 1, 20))
            .unwrap();
        let types: Vec<_> = alerts.iter().map(|a| a.alert_type).collect();
        assert_eq!(types, vec![AlertType::SchedulePerformance, AlertType::OverdueTask]);
    }

    #[test]
    fn test_engine_unknown_ids() {
        let store = fundaciones_store();
        let engine = EvmEngine::new(&store, EngineConfig::default());

        assert!(!engine.generate_linear_plan("missing"));
        assert!(!engine.recompute_actuals("missing"));
        assert!(matches!(
            engine.compute_curve("missing", None, None),
            Err(EvmError::UnknownTask(_))
        ));
        assert!(matches!(
            engine.compute_stage_curve("missing", None, None),
            Err(EvmError::UnknownStage(_))
        ));
    }

    #[test]
    fn test_labor_rate_is_injected() {
        let store = fundaciones_store();
        let config = EngineConfig {
            labor_rate: 1_000.0,
            ..EngineConfig::default()
        };
        let engine = EvmEngine::new(&store, config);
        assert!(engine.recompute_actuals("fundaciones"));

        let actuals = store.weekly_actuals("fundaciones");
        assert_eq!(actuals[0].actual_cost, 4_000.0);
        assert_eq!(actuals[1].actual_cost, 3_000.0);
    }
}

//! Linear distribution of a task's plan across its weeks.
//!
//! Every week touched by the planning window receives the same share of
//! quantity and budget. Partial first/last weeks are not weighted.

use super::week::weeks_between;
use super::{round_money, round_ratio};
use crate::error::{EvmError, EvmResult};
use crate::models::{Task, WeeklyPlan};
use crate::store::WeeklyStore;
use tracing::{debug, warn};

/// Build the weekly plan rows for `task` without touching any store.
pub fn linear_plan(task: &Task) -> EvmResult<Vec<WeeklyPlan>> {
    let Some((start, end)) = task.window() else {
        return Err(EvmError::InvalidTaskWindow {
            task_id: task.id.clone(),
            start: task.planned_start_date,
            end: task.planned_end_date,
        });
    };

    let weeks = weeks_between(Some(start), Some(end));
    if weeks.is_empty() {
        return Err(EvmError::EmptyWeekRange(task.id.clone()));
    }

    let n = weeks.len() as f64;
    let qty_per_week = round_ratio(task.planned_quantity / n);
    let value_per_week = round_money(task.planned_labor_budget.unwrap_or(0.0) / n);

    Ok(weeks
        .into_iter()
        .map(|week_start_date| WeeklyPlan {
            task_id: task.id.clone(),
            week_start_date,
            planned_quantity_this_week: qty_per_week,
            planned_value_this_week: value_per_week,
        })
        .collect())
}

/// Replace the task's weekly plan with a fresh linear distribution.
///
/// Returns `false` without writing anything when the planning window is
/// unusable, and `false` when the store rejects the replace (the previous
/// rows then remain).
pub fn generate_linear_plan<S: WeeklyStore + ?Sized>(store: &S, task: &Task) -> bool {
    let rows = match linear_plan(task) {
        Ok(rows) => rows,
        Err(e) => {
            debug!("Skipping plan for {}: {}", task.id, e);
            return false;
        }
    };

    let count = rows.len();
    match store.replace_weekly_plan(&task.id, rows) {
        Ok(()) => {
            debug!("Generated {} weekly plan rows for {}", count, task.id);
            true
        }
        Err(e) => {
            warn!("Failed to store weekly plan for {}: {}", task.id, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::evm::testutil::*;
    use crate::models::WeeklyActual;
    use crate::store::MemoryStore;

    /// Store whose replaces always fail.
    struct FailingStore;

    impl WeeklyStore for FailingStore {
        fn weekly_plan(&self, _task_id: &str) -> Vec<WeeklyPlan> {
            Vec::new()
        }

        fn weekly_actuals(&self, _task_id: &str) -> Vec<WeeklyActual> {
            Vec::new()
        }

        fn replace_weekly_plan(&self, _: &str, _: Vec<WeeklyPlan>) -> Result<(), StoreError> {
            Err(StoreError::Poisoned { table: "weekly_plan" })
        }

        fn replace_weekly_actuals(&self, _: &str, _: Vec<WeeklyActual>) -> Result<(), StoreError> {
            Err(StoreError::Poisoned { table: "weekly_actual" })
        }
    }

    #[test]
    fn test_fundaciones_plan() {
        let rows = linear_plan(&fundaciones()).unwrap();
        assert_eq!(rows.len(), 3);

        let weeks: Vec<_> = rows.iter().map(|r| r.week_start_date).collect();
        assert_eq!(weeks, vec![date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 15)]);
        for row in &rows {
            assert_eq!(row.planned_quantity_this_week, 10.0);
            assert_eq!(row.planned_value_this_week, 100_000.0);
        }
    }

    #[test]
    fn test_quantities_sum_within_rounding() {
        // 7 weeks of an awkward quantity.
        let task = task("t-odd", "s-1", date(2024, 3, 6), date(2024, 4, 17), 100.0, 1_000.0);
        let rows = linear_plan(&task).unwrap();
        assert_eq!(rows.len(), 7);

        let total: f64 = rows.iter().map(|r| r.planned_quantity_this_week).sum();
        let tolerance = 0.0005 * rows.len() as f64 + 1e-9;
        assert!((total - 100.0).abs() <= tolerance, "total was {}", total);
    }

    #[test]
    fn test_invalid_windows_rejected() {
        let mut task = fundaciones();
        task.planned_end_date = None;
        assert!(matches!(linear_plan(&task), Err(EvmError::InvalidTaskWindow { .. })));

        let mut reversed = fundaciones();
        reversed.planned_end_date = Some(date(2023, 12, 31));
        assert!(matches!(linear_plan(&reversed), Err(EvmError::InvalidTaskWindow { .. })));
    }

    #[test]
    fn test_missing_budget_plans_zero_value() {
        let mut task = fundaciones();
        task.planned_labor_budget = None;
        let rows = linear_plan(&task).unwrap();
        assert!(rows.iter().all(|r| r.planned_value_this_week == 0.0));
    }

    #[test]
    fn test_generate_is_idempotent() {
        let store = fundaciones_store();
        let task = fundaciones();

        assert!(generate_linear_plan(&store, &task));
        let first = store.weekly_plan(&task.id);
        assert!(generate_linear_plan(&store, &task));
        let second = store.weekly_plan(&task.id);

        assert_eq!(first, second);
        assert_eq!(store.plan_generation(&task.id), 2);
    }

    #[test]
    fn test_generate_replaces_previous_rows() {
        let store = fundaciones_store();
        let mut task = fundaciones();
        assert!(generate_linear_plan(&store, &task));

        task.planned_end_date = Some(date(2024, 1, 8));
        store.insert_task(task.clone()).unwrap();
        assert!(generate_linear_plan(&store, &task));

        let rows = store.weekly_plan(&task.id);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].planned_quantity_this_week, 15.0);
    }

    #[test]
    fn test_generate_invalid_window_writes_nothing() {
        let store = fundaciones_store();
        let good = fundaciones();
        assert!(generate_linear_plan(&store, &good));

        let mut bad = good.clone();
        bad.planned_start_date = None;
        assert!(!generate_linear_plan(&store, &bad));

        assert_eq!(store.weekly_plan(&good.id).len(), 3);
        assert_eq!(store.plan_generation(&good.id), 1);
    }

    #[test]
    fn test_generate_reports_store_failure() {
        assert!(!generate_linear_plan(&FailingStore, &fundaciones()));
    }

    #[test]
    fn test_generate_unknown_task_in_store() {
        let store = MemoryStore::new();
        assert!(!generate_linear_plan(&store, &fundaciones()));
    }
}

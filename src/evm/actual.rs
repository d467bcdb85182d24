//! Weekly aggregation of approved progress.

use super::round_money;
use super::week::week_start;
use crate::models::{ProgressEntry, Task, WeeklyActual};
use crate::store::{ProgressRepository, WeeklyStore};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Bucket approved entries into weekly actual rows, ordered by week.
///
/// Pending, rejected and untimestamped entries are ignored. Cost is
/// `hours_worked * labor_rate`. Weeks without approved entries get no row.
pub fn weekly_actuals(
    task_id: &str,
    entries: &[ProgressEntry],
    labor_rate: f64,
) -> Vec<WeeklyActual> {
    let mut buckets: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();

    for entry in entries.iter().filter(|e| e.task_id == task_id) {
        let Some(approved_on) = entry.approved_on() else {
            continue;
        };
        let bucket = buckets.entry(week_start(approved_on)).or_insert((0.0, 0.0));
        bucket.0 += entry.quantity_completed;
        bucket.1 += entry.hours_worked * labor_rate;
    }

    buckets
        .into_iter()
        .map(|(week_start_date, (quantity, cost))| WeeklyActual {
            task_id: task_id.to_string(),
            week_start_date,
            actual_quantity_completed: quantity,
            actual_cost: round_money(cost),
        })
        .collect()
}

/// Replace the task's weekly actuals with a fresh aggregation.
///
/// Returns `false` when the store rejects the replace; the previous rows
/// then remain.
pub fn recompute_actuals<S>(store: &S, task: &Task, labor_rate: f64) -> bool
where
    S: ProgressRepository + WeeklyStore + ?Sized,
{
    let entries = store.progress_entries(&task.id);
    let rows = weekly_actuals(&task.id, &entries, labor_rate);
    let count = rows.len();

    match store.replace_weekly_actuals(&task.id, rows) {
        Ok(()) => {
            debug!(
                "Aggregated {} progress entries into {} weeks for {}",
                entries.len(),
                count,
                task.id
            );
            true
        }
        Err(e) => {
            warn!("Failed to store weekly actuals for {}: {}", task.id, e);
            false
        }
    }
}

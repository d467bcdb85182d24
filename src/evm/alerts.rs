//! Performance, schedule and overdue alerts.
//!
//! Each trackable task is checked against the latest point of its full
//! curve. The three checks are independent, so one task can raise any
//! number of them. Alerts come back in task order then check order; sorting
//! and deduplication are left to the caller.

use super::curve::latest_point;
use crate::error::{EvmError, EvmResult};
use crate::models::{Alert, AlertType, SCurvePoint, Severity, Task};
use crate::store::{TaskRepository, WeeklyStore};
use chrono::NaiveDate;
use std::fmt;

/// Which tasks an alert scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertScope {
    Task(String),
    Stage(String),
    Project(String),
    All,
}

impl fmt::Display for AlertScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertScope::Task(id) => write!(f, "task {}", id),
            AlertScope::Stage(id) => write!(f, "stage {}", id),
            AlertScope::Project(id) => write!(f, "project {}", id),
            AlertScope::All => write!(f, "all tasks"),
        }
    }
}

/// Index levels below which alerts fire.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertThresholds {
    /// CPI below this raises a cost alert.
    pub cost: f64,
    /// CPI below this makes the cost alert high severity.
    pub cost_high: f64,
    /// SPI below this raises a schedule alert.
    pub schedule: f64,
    /// SPI below this makes the schedule alert high severity.
    pub schedule_high: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cost: 0.9,
            cost_high: 0.8,
            schedule: 0.9,
            schedule_high: 0.8,
        }
    }
}

impl From<&crate::config::AlertsConfig> for AlertThresholds {
    fn from(config: &crate::config::AlertsConfig) -> Self {
        Self {
            cost: config.cost_threshold,
            cost_high: config.cost_high_threshold,
            schedule: config.schedule_threshold,
            schedule_high: config.schedule_high_threshold,
        }
    }
}

/// Tasks covered by `scope`, trackable or not.
pub fn tasks_in_scope<S>(store: &S, scope: &AlertScope) -> EvmResult<Vec<Task>>
where
    S: TaskRepository + ?Sized,
{
    match scope {
        AlertScope::Task(id) => store
            .task(id)
            .map(|t| vec![t])
            .ok_or_else(|| EvmError::UnknownTask(id.clone())),
        AlertScope::Stage(id) => {
            if store.stage(id).is_none() {
                return Err(EvmError::UnknownStage(id.clone()));
            }
            Ok(store.tasks_in_stage(id))
        }
        AlertScope::Project(id) => {
            if !store.has_project(id) {
                return Err(EvmError::UnknownProject(id.clone()));
            }
            Ok(store
                .stages_in_project(id)
                .iter()
                .flat_map(|stage| store.tasks_in_stage(&stage.id))
                .collect())
        }
        AlertScope::All => Ok(store.all_tasks()),
    }
}

fn index_alert(
    alert_type: AlertType,
    label: &str,
    task: &Task,
    value: Option<f64>,
    threshold: f64,
    high_threshold: f64,
    date: NaiveDate,
) -> Option<Alert> {
    let value = value.filter(|v| *v < threshold)?;
    let severity = if value < high_threshold {
        Severity::High
    } else {
        Severity::Medium
    };
    Some(Alert {
        alert_type,
        severity,
        subject_id: task.id.clone(),
        message: format!(
            "Task '{}' {} at {:.3} (below {:.2})",
            task.name, label, value, threshold
        ),
        metric_value: value,
        date,
    })
}

/// Check one task given the latest point of its curve.
pub fn evaluate_task(
    task: &Task,
    latest: Option<&SCurvePoint>,
    today: NaiveDate,
    thresholds: &AlertThresholds,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let Some(point) = latest {
        alerts.extend(index_alert(
            AlertType::CostPerformance,
            "CPI",
            task,
            point.cpi,
            thresholds.cost,
            thresholds.cost_high,
            point.week_start_date,
        ));
        alerts.extend(index_alert(
            AlertType::SchedulePerformance,
            "SPI",
            task,
            point.spi,
            thresholds.schedule,
            thresholds.schedule_high,
            point.week_start_date,
        ));
    }

    if let Some(end) = task.planned_end_date {
        if today > end && task.completion_percentage < 100.0 {
            let days = (today - end).num_days();
            alerts.push(Alert {
                alert_type: AlertType::OverdueTask,
                severity: Severity::High,
                subject_id: task.id.clone(),
                message: format!(
                    "Task '{}' is {} days overdue ({:.0}% complete)",
                    task.name, days, task.completion_percentage
                ),
                metric_value: days as f64,
                date: today,
            });
        }
    }

    alerts
}

/// Alerts for every trackable task in `scope`.
///
/// Tasks without both dates and a budget are skipped.
pub fn detect_alerts<S>(
    store: &S,
    scope: &AlertScope,
    today: NaiveDate,
    thresholds: &AlertThresholds,
) -> EvmResult<Vec<Alert>>
where
    S: TaskRepository + WeeklyStore + ?Sized,
{
    let alerts = tasks_in_scope(store, scope)?
        .iter()
        .filter(|task| task.is_trackable())
        .flat_map(|task| {
            let latest = latest_point(store, task);
            evaluate_task(task, latest.as_ref(), today, thresholds)
        })
        .collect();
    Ok(alerts)
}

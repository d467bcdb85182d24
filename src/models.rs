//! Data models for the earned value engine.
//!
//! This module contains the core data structures used throughout the
//! crate: planning entities, weekly plan/actual rows, curve points and
//! alerts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A construction project. Owns stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// A stage of a project. Owns tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub project_id: String,
    pub name: String,
}

/// A plannable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier.
    pub id: String,
    /// Owning stage.
    pub stage_id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Planned start date (inclusive).
    #[serde(default)]
    pub planned_start_date: Option<NaiveDate>,
    /// Planned end date (inclusive).
    #[serde(default)]
    pub planned_end_date: Option<NaiveDate>,
    /// Physical quantity to deliver, in `unit_of_measure`.
    #[serde(default)]
    pub planned_quantity: f64,
    /// Budget at completion for labor.
    #[serde(default)]
    pub planned_labor_budget: Option<f64>,
    /// Unit of the planned quantity (m³, m², units...).
    #[serde(default)]
    pub unit_of_measure: String,
    /// Reported completion, 0-100.
    #[serde(default)]
    pub completion_percentage: f64,
}

impl Task {
    /// Returns the planning window when both dates are set and ordered.
    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.planned_start_date, self.planned_end_date) {
            (Some(start), Some(end)) if end >= start => Some((start, end)),
            _ => None,
        }
    }

    /// Whether the task carries enough data to take part in curves and alerts.
    pub fn is_trackable(&self) -> bool {
        self.planned_start_date.is_some()
            && self.planned_end_date.is_some()
            && self.planned_labor_budget.is_some()
    }
}

/// Approval state of a progress entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A field report of work done on a task. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: String,
    pub task_id: String,
    /// When the entry was approved; `None` while pending.
    #[serde(default)]
    pub approval_timestamp: Option<DateTime<Utc>>,
    pub quantity_completed: f64,
    #[serde(default)]
    pub hours_worked: f64,
    pub approval_status: ApprovalStatus,
}

impl ProgressEntry {
    /// The approval date if this entry counts towards actuals.
    pub fn approved_on(&self) -> Option<NaiveDate> {
        match (self.approval_status, self.approval_timestamp) {
            (ApprovalStatus::Approved, Some(ts)) => Some(ts.date_naive()),
            _ => None,
        }
    }
}

/// Planned quantity and value for one task in one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    pub task_id: String,
    /// Monday of the bucket.
    pub week_start_date: NaiveDate,
    pub planned_quantity_this_week: f64,
    pub planned_value_this_week: f64,
}

/// Approved quantity and cost for one task in one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyActual {
    pub task_id: String,
    /// Monday of the bucket.
    pub week_start_date: NaiveDate,
    pub actual_quantity_completed: f64,
    pub actual_cost: f64,
}

/// One week of a task's cumulative performance curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SCurvePoint {
    pub week_start_date: NaiveDate,
    pub cumulative_pv: f64,
    pub cumulative_ev: f64,
    pub cumulative_ac: f64,
    /// EV / AC; `None` while no cost has been recorded.
    pub cpi: Option<f64>,
    /// EV / PV; `None` while nothing is planned yet.
    pub spi: Option<f64>,
    pub cumulative_quantity_planned: f64,
    pub cumulative_quantity_actual: f64,
}

/// One week of a stage or project curve.
///
/// Quantities are not carried: tasks under one stage measure different units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatePoint {
    pub week_start_date: NaiveDate,
    pub cumulative_pv: f64,
    pub cumulative_ev: f64,
    pub cumulative_ac: f64,
    pub cpi: Option<f64>,
    pub spi: Option<f64>,
}

impl From<&SCurvePoint> for AggregatePoint {
    fn from(point: &SCurvePoint) -> Self {
        Self {
            week_start_date: point.week_start_date,
            cumulative_pv: point.cumulative_pv,
            cumulative_ev: point.cumulative_ev,
            cumulative_ac: point.cumulative_ac,
            cpi: point.cpi,
            spi: point.spi,
        }
    }
}

/// Standard EVM indicators at the latest point of a curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub as_of: NaiveDate,
    /// Budget at completion.
    pub bac: f64,
    pub pv: f64,
    pub ev: f64,
    pub ac: f64,
    /// Cost variance, EV - AC.
    pub cv: f64,
    /// Schedule variance, EV - PV.
    pub sv: f64,
    pub cpi: Option<f64>,
    pub spi: Option<f64>,
    /// Estimate at completion, BAC / CPI.
    pub eac: Option<f64>,
    /// Estimate to complete, EAC - AC.
    pub etc: Option<f64>,
    /// Variance at completion, BAC - EAC.
    pub vac: Option<f64>,
    /// Earned share of the budget, 0-100.
    pub percent_complete: Option<f64>,
}

/// Severity level of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
        }
    }
}

impl Severity {
    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Medium => "🟡",
            Severity::High => "🟠",
        }
    }
}

/// Kind of condition an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    CostPerformance,
    SchedulePerformance,
    OverdueTask,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertType::CostPerformance => write!(f, "cost_performance"),
            AlertType::SchedulePerformance => write!(f, "schedule_performance"),
            AlertType::OverdueTask => write!(f, "overdue_task"),
        }
    }
}

/// A detected performance or schedule condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    /// Task the alert is about.
    pub subject_id: String,
    pub message: String,
    /// CPI, SPI or days overdue, depending on the type.
    pub metric_value: f64,
    pub date: NaiveDate,
}

/// Summary of alerts found during analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertSummary {
    /// Total number of alerts.
    pub total: usize,
    /// Number of high severity alerts.
    pub high: usize,
    /// Number of medium severity alerts.
    pub medium: usize,
    /// Alerts grouped by type.
    pub by_type: std::collections::HashMap<String, usize>,
}

impl AlertSummary {
    /// Creates a summary from a list of alerts.
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let mut summary = Self {
            total: alerts.len(),
            ..Self::default()
        };

        for alert in alerts {
            match alert.severity {
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
            }

            *summary
                .by_type
                .entry(alert.alert_type.to_string())
                .or_insert(0) += 1;
        }

        summary
    }
}

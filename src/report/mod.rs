//! Report assembly and rendering.
//!
//! [`build_report`] runs the whole pipeline for one scope: it regenerates
//! weekly plans and actuals, computes the scope curve and per-task
//! indicators, and collects alerts. The generator renders the result as
//! Markdown or JSON.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report};

use crate::analysis::sort_alerts_by_severity;
use crate::error::EvmResult;
use crate::evm::curve::{compute_curve, performance_snapshot};
use crate::evm::hierarchy::aggregate_curves;
use crate::evm::{AlertScope, EvmEngine};
use crate::models::{AggregatePoint, Alert, AlertSummary, PerformanceSnapshot, Task};
use crate::store::EvmStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Dataset the figures come from.
    pub dataset: String,
    /// Human-readable scope ("project p-1", "all tasks"...).
    pub scope: String,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// Reference date for overdue checks.
    pub as_of: NaiveDate,
    /// Curve window, if any.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Labor rate used for actual cost.
    pub labor_rate: f64,
    /// Tasks with dates and budget.
    pub tasks_analyzed: usize,
    /// Tasks left out for missing dates or budget.
    pub tasks_skipped: usize,
    /// Total number of alerts.
    pub total_alerts: usize,
}

/// Indicators of a single task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPerformance {
    pub task_id: String,
    pub name: String,
    pub unit_of_measure: String,
    pub planned_quantity: f64,
    /// Cumulative approved quantity at the last curve point.
    pub quantity_done: f64,
    pub completion_percentage: f64,
    pub snapshot: Option<PerformanceSnapshot>,
}

/// The complete earned value report for one scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmReport {
    pub metadata: ReportMetadata,
    /// Indicators of the whole scope.
    pub snapshot: Option<PerformanceSnapshot>,
    /// Weekly cumulative curve of the whole scope.
    pub curve: Vec<AggregatePoint>,
    pub tasks: Vec<TaskPerformance>,
    /// Alerts ordered by severity for display.
    pub alerts: Vec<Alert>,
    pub summary: AlertSummary,
}

/// Inputs of [`build_report`] that are not part of the engine config.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub dataset: String,
    pub scope: AlertScope,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub today: NaiveDate,
}

fn scope_curve<S: EvmStore>(
    engine: &EvmEngine<'_, S>,
    request: &ReportRequest,
    task_curves: &[Vec<AggregatePoint>],
) -> EvmResult<Vec<AggregatePoint>> {
    let (from, to) = (request.from, request.to);
    match &request.scope {
        AlertScope::Task(id) => Ok(engine
            .compute_curve(id, from, to)?
            .iter()
            .map(AggregatePoint::from)
            .collect()),
        AlertScope::Stage(id) => engine.compute_stage_curve(id, from, to),
        AlertScope::Project(id) => engine.compute_project_curve(id, from, to),
        AlertScope::All => Ok(aggregate_curves(task_curves.iter().cloned())),
    }
}

/// Regenerate derived rows for the scope and assemble its report.
pub fn build_report<S: EvmStore>(
    engine: &EvmEngine<'_, S>,
    store: &S,
    request: &ReportRequest,
) -> EvmResult<EvmReport> {
    let tasks = engine.tasks_in_scope(&request.scope)?;
    engine.recompute_tasks(&tasks);

    let (trackable, skipped): (Vec<Task>, Vec<Task>) =
        tasks.into_iter().partition(|t| t.is_trackable());

    let mut task_curves = Vec::with_capacity(trackable.len());
    let mut performances = Vec::with_capacity(trackable.len());
    for task in &trackable {
        let points = compute_curve(store, task, request.from, request.to);
        let quantity_done = points
            .last()
            .map(|p| p.cumulative_quantity_actual)
            .unwrap_or(0.0);
        let curve: Vec<AggregatePoint> = points.iter().map(AggregatePoint::from).collect();
        let budget = task.planned_labor_budget.unwrap_or(0.0);

        performances.push(TaskPerformance {
            task_id: task.id.clone(),
            name: task.name.clone(),
            unit_of_measure: task.unit_of_measure.clone(),
            planned_quantity: task.planned_quantity,
            quantity_done,
            completion_percentage: task.completion_percentage,
            snapshot: performance_snapshot(&curve, budget),
        });
        task_curves.push(curve);
    }

    let curve = scope_curve(engine, request, &task_curves)?;
    let bac: f64 = trackable
        .iter()
        .filter_map(|t| t.planned_labor_budget)
        .sum();
    let snapshot = performance_snapshot(&curve, bac);

    let mut alerts = engine.detect_alerts(&request.scope, request.today)?;
    sort_alerts_by_severity(&mut alerts);
    let summary = AlertSummary::from_alerts(&alerts);

    info!(
        "Report for {}: {} tasks, {} weeks, {} alerts",
        request.scope,
        trackable.len(),
        curve.len(),
        alerts.len()
    );

    Ok(EvmReport {
        metadata: ReportMetadata {
            dataset: request.dataset.clone(),
            scope: request.scope.to_string(),
            generated_at: Utc::now(),
            as_of: request.today,
            from: request.from,
            to: request.to,
            labor_rate: engine.config().labor_rate,
            tasks_analyzed: trackable.len(),
            tasks_skipped: skipped.len(),
            total_alerts: summary.total,
        },
        snapshot,
        curve,
        tasks: performances,
        alerts,
        summary,
    })
}

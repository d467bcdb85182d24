//! Markdown and JSON report generation.
//!
//! This module renders an [`EvmReport`] for people (Markdown) or for other
//! tools (JSON).

use super::{EvmReport, ReportMetadata, TaskPerformance};
use crate::analysis::{generate_summary_text, group_by_type, most_alerted_tasks};
use crate::config::ReportConfig;
use crate::models::{
    AggregatePoint, Alert, AlertSummary, AlertType, PerformanceSnapshot, Severity,
};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &EvmReport, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# evmtrack Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_performance_section(report.snapshot.as_ref()));
    output.push_str(&generate_tasks_section(&report.tasks));

    if options.include_curves {
        output.push_str(&generate_curve_section(&report.curve, options.max_curve_rows));
    }

    output.push_str(&generate_alerts_section(&report.summary, &report.alerts));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Dataset:** {}\n", metadata.dataset));
    section.push_str(&format!("- **Scope:** {}\n", metadata.scope));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **As Of:** {}\n", metadata.as_of));
    if metadata.from.is_some() || metadata.to.is_some() {
        let bound = |d: Option<chrono::NaiveDate>| d.map_or("…".to_string(), |d| d.to_string());
        section.push_str(&format!(
            "- **Window:** {} to {}\n",
            bound(metadata.from),
            bound(metadata.to)
        ));
    }
    section.push_str(&format!("- **Labor Rate:** {:.2}/h\n", metadata.labor_rate));
    section.push_str(&format!(
        "- **Tasks Analyzed:** {}\n",
        metadata.tasks_analyzed
    ));
    if metadata.tasks_skipped > 0 {
        section.push_str(&format!(
            "- **Tasks Skipped:** {} (missing dates or budget)\n",
            metadata.tasks_skipped
        ));
    }
    section.push_str(&format!("- **Total Alerts:** {}\n", metadata.total_alerts));
    section.push('\n');

    section
}

fn fmt_ratio(value: Option<f64>) -> String {
    value.map_or("n/a".to_string(), |v| format!("{:.3}", v))
}

fn fmt_money(value: Option<f64>) -> String {
    value.map_or("n/a".to_string(), |v| format!("{:.2}", v))
}

/// Generate the performance section for the whole scope.
fn generate_performance_section(snapshot: Option<&PerformanceSnapshot>) -> String {
    let mut section = String::new();

    section.push_str("## Performance\n\n");

    let Some(s) = snapshot else {
        section.push_str("No plan or approved progress in scope.\n\n");
        return section;
    };

    section.push_str(&format!("*Week of {}*\n\n", s.as_of));
    section.push_str("| Indicator | Value |\n");
    section.push_str("|:---|---:|\n");
    for (label, value) in [
        ("Budget at Completion (BAC)", format!("{:.2}", s.bac)),
        ("Planned Value (PV)", format!("{:.2}", s.pv)),
        ("Earned Value (EV)", format!("{:.2}", s.ev)),
        ("Actual Cost (AC)", format!("{:.2}", s.ac)),
        ("Cost Variance (CV)", format!("{:.2}", s.cv)),
        ("Schedule Variance (SV)", format!("{:.2}", s.sv)),
        ("CPI", fmt_ratio(s.cpi)),
        ("SPI", fmt_ratio(s.spi)),
        ("Estimate at Completion (EAC)", fmt_money(s.eac)),
        ("Estimate to Complete (ETC)", fmt_money(s.etc)),
        ("Variance at Completion (VAC)", fmt_money(s.vac)),
        (
            "Earned %",
            s.percent_complete
                .map_or("n/a".to_string(), |p| format!("{:.1}%", p)),
        ),
    ] {
        section.push_str(&format!("| {} | {} |\n", label, value));
    }
    section.push('\n');

    section
}

/// Generate the per-task table.
fn generate_tasks_section(tasks: &[TaskPerformance]) -> String {
    let mut section = String::new();

    section.push_str("## Tasks\n\n");

    if tasks.is_empty() {
        section.push_str("No trackable tasks in scope.\n\n");
        return section;
    }

    section.push_str("| Task | Done | Completion | PV | EV | AC | CPI | SPI |\n");
    section.push_str("|:---|---:|---:|---:|---:|---:|:---:|:---:|\n");

    for task in tasks {
        let (pv, ev, ac, cpi, spi) = match &task.snapshot {
            Some(s) => (
                format!("{:.2}", s.pv),
                format!("{:.2}", s.ev),
                format!("{:.2}", s.ac),
                fmt_ratio(s.cpi),
                fmt_ratio(s.spi),
            ),
            None => Default::default(),
        };
        section.push_str(&format!(
            "| {} | {} / {} {} | {:.0}% | {} | {} | {} | {} | {} |\n",
            task.name,
            task.quantity_done,
            task.planned_quantity,
            task.unit_of_measure,
            task.completion_percentage,
            pv,
            ev,
            ac,
            cpi,
            spi
        ));
    }
    section.push('\n');

    section
}

/// Generate the S-curve table, keeping the most recent `max_rows` weeks.
fn generate_curve_section(curve: &[AggregatePoint], max_rows: usize) -> String {
    let mut section = String::new();

    section.push_str("## S-Curve\n\n");

    if curve.is_empty() {
        section.push_str("No weeks to show.\n\n");
        return section;
    }

    let skip = curve.len().saturating_sub(max_rows);
    if skip > 0 {
        section.push_str(&format!(
            "*Showing the last {} of {} weeks*\n\n",
            curve.len() - skip,
            curve.len()
        ));
    }

    section.push_str("| Week | PV | EV | AC | CPI | SPI |\n");
    section.push_str("|:---|---:|---:|---:|:---:|:---:|\n");
    for point in &curve[skip..] {
        section.push_str(&format!(
            "| {} | {:.2} | {:.2} | {:.2} | {} | {} |\n",
            point.week_start_date,
            point.cumulative_pv,
            point.cumulative_ev,
            point.cumulative_ac,
            fmt_ratio(point.cpi),
            fmt_ratio(point.spi)
        ));
    }
    section.push('\n');

    section
}

/// Generate the alerts section.
fn generate_alerts_section(summary: &AlertSummary, alerts: &[Alert]) -> String {
    let mut section = String::new();

    section.push_str("## Alerts\n\n");

    if alerts.is_empty() {
        section.push_str("No alerts. Every task is within thresholds. 🎉\n\n");
        return section;
    }

    section.push_str("```\n");
    section.push_str(&generate_summary_text(summary));
    section.push_str("\n```\n\n");

    let top = most_alerted_tasks(alerts, 5);
    if top.len() > 1 {
        section.push_str("### Most Alerted Tasks\n\n");
        section.push_str("| Task | Alerts |\n");
        section.push_str("|:---|:---:|\n");
        for (task, count) in top {
            section.push_str(&format!("| `{}` | {} |\n", task, count));
        }
        section.push('\n');
    }

    // Alerts by type, each group keeping the severity order
    let grouped = group_by_type(alerts);
    for alert_type in [
        AlertType::CostPerformance,
        AlertType::SchedulePerformance,
        AlertType::OverdueTask,
    ] {
        let Some(group) = grouped.get(&alert_type) else {
            continue;
        };
        section.push_str(&format!("### {} ({})\n\n", alert_type, group.len()));
        for alert in group {
            section.push_str(&generate_alert_block(alert));
        }
    }

    section
}

/// Generate a single alert block.
fn generate_alert_block(alert: &Alert) -> String {
    let mut block = String::new();

    let severity_badge = match alert.severity {
        Severity::High => "🟠 **HIGH**",
        Severity::Medium => "🟡 **MEDIUM**",
    };

    block.push_str(&format!(
        "#### {} {} - `{}`\n\n",
        severity_badge, alert.alert_type, alert.subject_id
    ));
    block.push_str(&format!(
        "**Date:** {} | **Value:** {}\n\n",
        alert.date, alert.metric_value
    ));
    block.push_str(&format!("{}\n\n", alert.message));
    block.push_str("---\n\n");

    block
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by evmtrack*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &EvmReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn save_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

//! Alert aggregation and statistics.
//!
//! This module provides utilities for ordering and grouping alerts and
//! computing summary text for reports.

use crate::models::{Alert, AlertSummary, AlertType, Severity};
use std::collections::HashMap;

/// Sort alerts by severity (high first), then by subject and type.
pub fn sort_alerts_by_severity(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.subject_id.cmp(&b.subject_id))
            .then_with(|| a.alert_type.to_string().cmp(&b.alert_type.to_string()))
    });
}

/// Group alerts by subject task.
pub fn group_by_subject(alerts: &[Alert]) -> HashMap<String, Vec<Alert>> {
    let mut grouped: HashMap<String, Vec<Alert>> = HashMap::new();

    for alert in alerts {
        grouped
            .entry(alert.subject_id.clone())
            .or_default()
            .push(alert.clone());
    }

    grouped
}

/// Group alerts by type.
pub fn group_by_type(alerts: &[Alert]) -> HashMap<AlertType, Vec<Alert>> {
    let mut grouped: HashMap<AlertType, Vec<Alert>> = HashMap::new();

    for alert in alerts {
        grouped.entry(alert.alert_type).or_default().push(alert.clone());
    }

    grouped
}

/// Identify the tasks with the most alerts.
pub fn most_alerted_tasks(alerts: &[Alert], n: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = group_by_subject(alerts)
        .into_iter()
        .map(|(subject, alerts)| (subject, alerts.len()))
        .collect();

    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(n);
    counts
}

/// Whether any alert is at or above `threshold`.
pub fn any_at_or_above(alerts: &[Alert], threshold: Severity) -> bool {
    alerts.iter().any(|a| a.severity >= threshold)
}

/// Generate a text summary of alert statistics.
pub fn generate_summary_text(summary: &AlertSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Total Alerts: {}", summary.total));
    lines.push(format!("- {} High: {}", Severity::High.emoji(), summary.high));
    lines.push(format!(
        "- {} Medium: {}",
        Severity::Medium.emoji(),
        summary.medium
    ));

    if !summary.by_type.is_empty() {
        lines.push(String::new());
        lines.push("By Type:".to_string());

        let mut types: Vec<_> = summary.by_type.iter().collect();
        types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (alert_type, count) in types {
            lines.push(format!("- {}: {}", alert_type, count));
        }
    }

    lines.join("\n")
}

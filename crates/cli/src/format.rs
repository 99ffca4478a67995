//! Text and JSON rendering.

use isolab::prelude::{Event, ReplayTrace, RowView};
use isolab::replay::TraceStep;

use crate::demo::DemoReport;

/// Render demo reports, one line per scenario and level.
pub fn format_reports(reports: &[DemoReport]) -> String {
    let mut out = format!("{:<12} {:<20} {}\n", "SCENARIO", "LEVEL", "ANOMALY");
    for report in reports {
        out.push_str(&format!(
            "{:<12} {:<20} {}\n",
            report.scenario.as_str(),
            report.level.as_str(),
            report.verdict
        ));
    }
    out
}

/// Render a replay trace: steps in completion order, then final rows.
pub fn format_trace(trace: &ReplayTrace) -> String {
    let mut out = String::new();
    for step in &trace.steps {
        out.push_str(&format_step(step));
        out.push('\n');
    }
    if trace.timed_out {
        let pending: Vec<String> = trace.pending.iter().map(|i| format!("#{i}")).collect();
        out.push_str(&format!("timed out; never finished: {}\n", pending.join(" ")));
    }
    out.push_str("rows:\n");
    for row in &trace.rows {
        out.push_str(&format_row(row));
        out.push('\n');
    }
    out
}

fn format_step(step: &TraceStep) -> String {
    let action = match &step.event {
        Event::Read { key, .. } => format!("read {key}"),
        Event::Write { key, value, .. } => format!("write {key}={value}"),
        Event::Commit { .. } => "commit".to_string(),
    };
    let mut line = format!("#{:<3} {:<6} {:<16}", step.index, step.tx.as_str(), action);
    if let Some(value) = &step.observed {
        line.push_str(&format!(" -> {value}"));
    }
    if step.blocked {
        line.push_str(" (waited)");
    }
    if let Some(error) = &step.error {
        line.push_str(&format!(" (error) {error}"));
    }
    line
}

fn format_row(row: &RowView) -> String {
    let mut line = format!(
        "  {} committed={} latest={}",
        row.key, row.committed, row.latest_uncommitted
    );
    for (tx, value) in &row.uncommitted_by_tx {
        line.push_str(&format!(" {tx}:{value}"));
    }
    line
}

/// Pretty JSON, falling back to the error text.
pub fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("(error) {}", e))
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use rollcall_core::{AttendanceEvent, HealthReport, LiveView, StatusSummary};

use crate::health::HealthState;
use crate::sync::ConnectionState;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One feed row: time, student, status and match confidence.
pub fn format_event(event: &AttendanceEvent) -> String {
    let name = event
        .payload
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or(&event.subject_id);
    let status = event
        .payload
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or(event.kind.as_str());

    let mut line = format!("{}  {}", event.timestamp.format(TIME_FORMAT), name);
    if name != event.subject_id {
        line.push_str(&format!(" ({})", event.subject_id));
    }
    line.push_str(&format!("  {status}"));
    if let Some(confidence) = event.payload.get("confidence").and_then(|v| v.as_f64()) {
        line.push_str(&format!("  {:.0}%", confidence * 100.0));
    }
    line
}

pub fn format_status(status: &StatusSummary) -> String {
    format!(
        "{} ({})\n  signed in: {}/{}  absent: {}  rate: {:.1}%  avg confidence: {:.2}",
        display_or(&status.course_name, "no active course"),
        display_or(&status.course_date, "-"),
        status.signed_count,
        status.total_students,
        status.absent_count,
        status.sign_rate,
        status.avg_confidence,
    )
}

/// Status header followed by the feed.
pub fn format_view(view: &LiveView) -> String {
    let mut out = match &view.status {
        Some(status) => format_status(status),
        None => "(no summary yet)".to_string(),
    };
    if view.events.is_empty() {
        out.push_str("\n  no sign-ins yet");
    }
    for event in &view.events {
        out.push_str("\n  ");
        out.push_str(&format_event(event));
    }
    out
}

pub fn format_health_report(report: &HealthReport) -> String {
    let verdict = if report.is_healthy() {
        "healthy"
    } else {
        "unhealthy"
    };
    format!("{verdict} (status: {}, version: {})", report.status, report.version)
}

pub fn format_health_state(state: &HealthState) -> String {
    if state.is_unchecked() {
        return "health: not checked yet".to_string();
    }
    match (&state.last_error, state.healthy) {
        (_, true) => format!(
            "health: ok (version {})",
            state.version.as_deref().unwrap_or("unknown")
        ),
        (Some(cause), false) => format!("health: DOWN ({cause})"),
        (None, false) => "health: DOWN".to_string(),
    }
}

pub fn format_connection(state: ConnectionState) -> String {
    format!("push: {state}")
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time status values returned by the REST boundary.

use serde::{Deserialize, Serialize};

/// Status value reported by a healthy server.
pub const HEALTHY: &str = "healthy";

/// Today's attendance summary for the current session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub course_date: String,
    #[serde(default)]
    pub total_students: u32,
    #[serde(default)]
    pub signed_count: u32,
    #[serde(default)]
    pub absent_count: u32,
    /// Percentage of students signed in, 0–100.
    #[serde(default)]
    pub sign_rate: f64,
    #[serde(default)]
    pub avg_confidence: f64,
}

/// Body of the liveness endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub version: String,
}

impl HealthReport {
    /// Returns true if the server reports itself healthy.
    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY
    }
}

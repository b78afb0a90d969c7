//! Anomaly detection over snapshot history and the alerts it produces.

pub mod alerts;
pub mod anomaly;
pub mod engine;

pub use self::alerts::AlertQueue;
pub use self::engine::{AnomalyDetector, WatchedMetric};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    #[error("insufficient baseline data: need {needed} samples, have {have}")]
    InsufficientBaseline { needed: usize, have: usize },
    #[error("baseline has zero variance")]
    ZeroVariance,
}

/// Severity tiers for alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Band a healthy value is expected to fall in: mean +- 2 stddev.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExpectedRange {
    pub lower: f64,
    pub upper: f64,
}

/// A metric that left its expected range.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Alert {
    pub id: uuid::Uuid,
    pub metric: WatchedMetric,
    pub observed: f64,
    pub expected_range: ExpectedRange,
    pub baseline_mean: f64,
    pub baseline_std_dev: f64,
    pub z_score: f64,
    pub severity: Severity,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub recommended_action: String,
}

impl Alert {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{} {} at {:.2} (expected {:.2}..{:.2}, z={:.1})",
            self.severity.to_string().to_uppercase(),
            self.metric,
            self.observed,
            self.expected_range.lower,
            self.expected_range.upper,
            self.z_score
        )
    }
}

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::analysis::MetricSnapshot;
use crate::config::DetectorConfig;
use crate::detect::anomaly::Baseline;
use crate::detect::{Alert, Severity};

/// Snapshot metrics the detector watches, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedMetric {
    ConversionRate,
    EventsPerSecond,
    AvgOrderValue,
    RevenuePerSecond,
}

impl WatchedMetric {
    pub const ALL: [WatchedMetric; 4] = [
        WatchedMetric::ConversionRate,
        WatchedMetric::EventsPerSecond,
        WatchedMetric::AvgOrderValue,
        WatchedMetric::RevenuePerSecond,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchedMetric::ConversionRate => "conversion_rate",
            WatchedMetric::EventsPerSecond => "events_per_second",
            WatchedMetric::AvgOrderValue => "avg_order_value",
            WatchedMetric::RevenuePerSecond => "revenue_per_second",
        }
    }

    pub fn value(&self, snapshot: &MetricSnapshot) -> f64 {
        match self {
            WatchedMetric::ConversionRate => snapshot.conversion_rate,
            WatchedMetric::EventsPerSecond => snapshot.events_per_second,
            WatchedMetric::AvgOrderValue => snapshot.avg_order_value,
            WatchedMetric::RevenuePerSecond => snapshot.revenue_per_second,
        }
    }

    /// Operator guidance for a deviation in the given direction.
    pub fn recommended_action(&self, above_baseline: bool) -> &'static str {
        match (self, above_baseline) {
            (WatchedMetric::ConversionRate, false) => "Check checkout process and payment systems",
            (WatchedMetric::ConversionRate, true) => {
                "Verify purchase tracking for duplicates and confirm stock for demand"
            }
            (WatchedMetric::EventsPerSecond, false) => "Check tracking implementation and site availability",
            (WatchedMetric::EventsPerSecond, true) => {
                "Identify the traffic source (campaign or bots) and watch site capacity"
            }
            (WatchedMetric::AvgOrderValue, false) => "Review recent discounts and pricing changes",
            (WatchedMetric::AvgOrderValue, true) => "Review large orders for bulk buying or fraud",
            (WatchedMetric::RevenuePerSecond, false) => {
                "Check payment provider health and activate cart recovery campaigns"
            }
            (WatchedMetric::RevenuePerSecond, true) => {
                "Confirm order validity and stock levels for top sellers"
            }
        }
    }
}

impl std::fmt::Display for WatchedMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rolling z-score outlier test against recent snapshot history.
///
/// A heuristic, not a trend-aware model: a genuine shift in traffic (a real
/// surge, a sale) is flagged exactly like a fault until the baseline catches
/// up. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Compare `current` against the tail of `history` (oldest first).
    ///
    /// Returns alerts in [`WatchedMetric::ALL`] order. Empty when the history
    /// is shorter than `minimum_history`.
    pub fn check<'a, I>(&self, current: &MetricSnapshot, history: I) -> Vec<Alert>
    where
        I: IntoIterator<Item = &'a MetricSnapshot>,
        I::IntoIter: DoubleEndedIterator + ExactSizeIterator,
    {
        let history = history.into_iter();
        let have = history.len();
        if have < self.config.minimum_history {
            debug!(have, needed = self.config.minimum_history, "history too short for anomaly check");
            return Vec::new();
        }

        let baseline: Vec<&MetricSnapshot> = history.rev().take(self.config.baseline_window).collect();

        let mut alerts = Vec::new();
        for metric in WatchedMetric::ALL {
            let stats = Baseline::from_values(baseline.iter().map(|s| metric.value(s)));
            let observed = metric.value(current);

            let z_score = match stats.z_score(observed) {
                Ok(z) => z,
                Err(e) => {
                    trace!(%metric, error = %e, "metric skipped");
                    continue;
                }
            };

            if z_score <= self.config.anomaly_threshold {
                continue;
            }

            let mean = stats.mean();
            let severity = if z_score > self.config.high_severity_z {
                Severity::High
            } else {
                Severity::Medium
            };

            alerts.push(Alert {
                id: uuid::Uuid::new_v4(),
                metric,
                observed,
                expected_range: stats.expected_range(),
                baseline_mean: mean,
                baseline_std_dev: stats.std_dev(),
                z_score,
                severity,
                timestamp: current.timestamp,
                recommended_action: metric.recommended_action(observed > mean).to_string(),
            });
        }

        alerts
    }
}

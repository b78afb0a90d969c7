use std::collections::VecDeque;

use tracing::warn;

use crate::detect::Alert;

/// Pending alerts awaiting a consumer. Reads drain.
#[derive(Debug, Clone)]
pub struct AlertQueue {
    max_pending: usize,
    pending: VecDeque<Alert>,
    recorded: u64,
    dropped: u64,
}

impl AlertQueue {
    pub fn new(max_pending: usize) -> Self {
        Self {
            max_pending: max_pending.max(1),
            pending: VecDeque::new(),
            recorded: 0,
            dropped: 0,
        }
    }

    /// Queue an alert, discarding the oldest pending one when full.
    pub fn record(&mut self, alert: Alert) {
        warn!(
            metric = %alert.metric,
            severity = %alert.severity,
            observed = alert.observed,
            z_score = alert.z_score,
            action = %alert.recommended_action,
            "anomaly detected"
        );
        if self.pending.len() == self.max_pending {
            if let Some(old) = self.pending.pop_front() {
                self.dropped += 1;
                warn!(id = %old.id, metric = %old.metric, "alert queue full, dropping oldest undrained alert");
            }
        }
        self.pending.push_back(alert);
        self.recorded += 1;
    }

    /// Take every pending alert, oldest first.
    pub fn drain(&mut self) -> Vec<Alert> {
        self.pending.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Alerts ever recorded.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Alerts lost to overflow before anyone drained them.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

//! The stream engine: one aggregator, one history, one detector, one alert
//! queue, mutated through a single ingest path.

pub mod handle;

pub use self::handle::EngineHandle;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::{Clock, MetricSnapshot, SnapshotHistory, SystemClock, WindowAggregator};
use crate::config::AppConfig;
use crate::detect::{Alert, AlertQueue, AnomalyDetector};
use crate::event::{Event, InvalidEventError, RawEvent};

/// What one ingestion produced.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub snapshot: MetricSnapshot,
    /// False when the event was already outside the window and was dropped.
    pub admitted: bool,
    /// Alerts raised by this snapshot; also queued for [`StreamEngine::get_alerts`].
    pub alerts: Vec<Alert>,
}

/// Running totals for an engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineStats {
    pub ingested: u64,
    pub rejected: u64,
    pub late_dropped: u64,
    pub alerts_raised: u64,
    pub alerts_dropped: u64,
    pub alerts_pending: usize,
    pub window_events: usize,
    pub history_len: usize,
}

pub struct StreamEngine {
    aggregator: WindowAggregator,
    history: SnapshotHistory,
    detector: AnomalyDetector,
    alerts: AlertQueue,
    ingested: u64,
    rejected: u64,
}

impl StreamEngine {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            window_seconds = config.window.window_seconds,
            time_basis = ?config.window.time_basis,
            history_capacity = config.history.capacity,
            threshold = config.detector.anomaly_threshold,
            "stream engine created"
        );
        Self {
            aggregator: WindowAggregator::new(config.window.span(), config.window.time_basis, clock),
            history: SnapshotHistory::new(config.history.capacity),
            detector: AnomalyDetector::new(config.detector.clone()),
            alerts: AlertQueue::new(config.alerts.max_pending),
            ingested: 0,
            rejected: 0,
        }
    }

    pub fn with_system_clock(config: &AppConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Validate and ingest a raw event. Rejected events leave no trace in the
    /// window or history.
    pub fn ingest(&mut self, raw: RawEvent) -> Result<IngestOutcome, InvalidEventError> {
        match Event::try_from(raw) {
            Ok(event) => Ok(self.admit(event)),
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Ingest an already-built event.
    pub fn ingest_event(&mut self, event: Event) -> Result<IngestOutcome, InvalidEventError> {
        match event.validate() {
            Ok(()) => Ok(self.admit(event)),
            Err(e) => Err(self.reject(e)),
        }
    }

    fn reject(&mut self, error: InvalidEventError) -> InvalidEventError {
        self.rejected += 1;
        debug!(%error, "event rejected");
        error
    }

    fn admit(&mut self, event: Event) -> IngestOutcome {
        let late_before = self.aggregator.late_dropped();
        let snapshot = self.aggregator.ingest(event);

        // Late drops leave the window as it was; recording them would only
        // repeat the previous snapshot in history.
        if self.aggregator.late_dropped() > late_before {
            return IngestOutcome {
                snapshot,
                admitted: false,
                alerts: Vec::new(),
            };
        }
        self.ingested += 1;

        // The baseline is the history before this snapshot joins it.
        let alerts = self.detector.check(&snapshot, &self.history);
        self.history.push(snapshot.clone());
        for alert in &alerts {
            self.alerts.record(alert.clone());
        }

        IngestOutcome {
            snapshot,
            admitted: true,
            alerts,
        }
    }

    /// Read-only metrics over the current window.
    pub fn snapshot(&self) -> MetricSnapshot {
        self.aggregator.snapshot()
    }

    pub fn get_current_metrics(&self) -> MetricSnapshot {
        self.snapshot()
    }

    /// Run the detector on `snapshot` against the current history without
    /// recording anything.
    pub fn check(&self, snapshot: &MetricSnapshot) -> Vec<Alert> {
        self.detector.check(snapshot, &self.history)
    }

    /// Take all pending alerts.
    pub fn get_alerts(&mut self) -> Vec<Alert> {
        self.alerts.drain()
    }

    /// Snapshots from the trailing `duration`, oldest first. A duration
    /// reaching past the representable range returns the whole history.
    pub fn get_history(&self, duration: TimeDelta) -> Vec<MetricSnapshot> {
        match self.aggregator.reference_time().checked_sub_signed(duration) {
            Some(cutoff) => self.history.since(cutoff),
            None => self.history.iter().cloned().collect(),
        }
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    /// Advance time and evict what aged out.
    pub fn advance(&mut self, now: DateTime<Utc>) -> usize {
        self.aggregator.advance(now)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            ingested: self.ingested,
            rejected: self.rejected,
            late_dropped: self.aggregator.late_dropped(),
            alerts_raised: self.alerts.recorded(),
            alerts_dropped: self.alerts.dropped(),
            alerts_pending: self.alerts.pending(),
            window_events: self.aggregator.len(),
            history_len: self.history.len(),
        }
    }

    /// End the engine's life, releasing the window and history.
    pub fn dispose(self) -> EngineStats {
        let stats = self.stats();
        info!(
            ingested = stats.ingested,
            rejected = stats.rejected,
            alerts = stats.alerts_raised,
            "stream engine disposed"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TimeBasis;
    use crate::event::EventType;
    use chrono::TimeZone;

    fn event_time_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.window.time_basis = TimeBasis::EventTime;
        cfg
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_rejected_event_does_not_touch_state() {
        let mut engine = StreamEngine::with_system_clock(&event_time_config());
        engine
            .ingest_event(Event::new(ts(0), "s", "c", EventType::PageView))
            .unwrap();

        let bad = RawEvent {
            timestamp: Some(ts(1).to_rfc3339()),
            session_id: Some("s2".into()),
            customer_id: Some("c2".into()),
            event_type: Some("refund".into()),
            device_type: Some("mobile".into()),
            channel: Some("direct".into()),
            ..Default::default()
        };
        assert!(engine.ingest(bad).is_err());

        let stats = engine.stats();
        assert_eq!(stats.ingested, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.window_events, 1);
        assert_eq!(stats.history_len, 1);
        assert_eq!(engine.snapshot().timestamp, ts(0));
    }

    #[test]
    fn test_each_ingest_appends_history() {
        let mut engine = StreamEngine::with_system_clock(&event_time_config());
        for i in 0..5 {
            engine
                .ingest_event(Event::new(ts(i), format!("s{i}"), "c", EventType::PageView))
                .unwrap();
        }
        assert_eq!(engine.history().len(), 5);
        assert_eq!(engine.history().latest().map(|s| s.total_events), Some(5));
    }

    #[test]
    fn test_get_history_filters_by_duration() {
        let mut engine = StreamEngine::with_system_clock(&event_time_config());
        for i in 0..10 {
            engine
                .ingest_event(Event::new(ts(i * 10), format!("s{i}"), "c", EventType::PageView))
                .unwrap();
        }
        // Reference is ts(90); the last 30s holds snapshots at 70, 80, 90.
        let recent = engine.get_history(TimeDelta::seconds(30));
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].timestamp, ts(70));
        assert_eq!(engine.get_history(TimeDelta::hours(1)).len(), 10);
    }

    #[test]
    fn test_get_history_with_unbounded_duration() {
        let mut engine = StreamEngine::with_system_clock(&event_time_config());
        for i in 0..4 {
            engine
                .ingest_event(Event::new(ts(i), "s", "c", EventType::PageView))
                .unwrap();
        }
        assert_eq!(engine.get_history(TimeDelta::MAX).len(), 4);
        assert_eq!(engine.get_history(TimeDelta::days(365 * 1000)).len(), 4);
    }

    #[test]
    fn test_late_event_skips_history_and_detector() {
        let mut cfg = event_time_config();
        cfg.window.window_seconds = 10;
        let mut engine = StreamEngine::with_system_clock(&cfg);
        engine
            .ingest_event(Event::new(ts(100), "s1", "c", EventType::PageView))
            .unwrap();

        let outcome = engine
            .ingest_event(Event::new(ts(50), "s2", "c", EventType::PageView))
            .unwrap();
        assert!(!outcome.admitted);
        assert!(outcome.alerts.is_empty());
        assert_eq!(outcome.snapshot.total_events, 1);

        let stats = engine.stats();
        assert_eq!(stats.ingested, 1);
        assert_eq!(stats.late_dropped, 1);
        assert_eq!(stats.history_len, 1);
    }

    #[test]
    fn test_dispose_reports_totals() {
        let mut engine = StreamEngine::with_system_clock(&event_time_config());
        engine
            .ingest_event(Event::new(ts(0), "s", "c", EventType::Purchase).with_revenue(10.0))
            .unwrap();
        let stats = engine.dispose();
        assert_eq!(stats.ingested, 1);
        assert_eq!(stats.alerts_raised, 0);
    }
}

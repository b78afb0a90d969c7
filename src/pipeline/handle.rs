use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::analysis::MetricSnapshot;
use crate::detect::Alert;
use crate::event::{InvalidEventError, RawEvent};
use crate::pipeline::{EngineStats, IngestOutcome, StreamEngine};

/// Shared, serialised access to one [`StreamEngine`].
///
/// Every call takes the lock for one bounded synchronous operation and hands
/// back owned data; nothing outside the lock holds a reference into the window.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Mutex<StreamEngine>>,
}

impl EngineHandle {
    pub fn new(engine: StreamEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub async fn ingest(&self, raw: RawEvent) -> Result<IngestOutcome, InvalidEventError> {
        self.inner.lock().await.ingest(raw)
    }

    pub async fn current_metrics(&self) -> MetricSnapshot {
        self.inner.lock().await.get_current_metrics()
    }

    pub async fn drain_alerts(&self) -> Vec<Alert> {
        self.inner.lock().await.get_alerts()
    }

    pub async fn history(&self, duration: TimeDelta) -> Vec<MetricSnapshot> {
        self.inner.lock().await.get_history(duration)
    }

    pub async fn advance(&self, now: DateTime<Utc>) -> usize {
        self.inner.lock().await.advance(now)
    }

    pub async fn stats(&self) -> EngineStats {
        self.inner.lock().await.stats()
    }

    /// Recover the engine once every other handle is gone.
    pub fn into_inner(self) -> Option<StreamEngine> {
        Arc::try_unwrap(self.inner).ok().map(Mutex::into_inner)
    }
}

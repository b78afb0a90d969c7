use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::analysis::snapshot::MetricSnapshot;
use crate::analysis::window::EventWindow;
use crate::event::Event;

/// Source of "now" for wall-clock eviction.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What the window's age is measured against.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBasis {
    /// Ages are relative to the clock. Live streams.
    #[default]
    WallClock,
    /// Ages are relative to the newest event timestamp seen. Replays.
    EventTime,
}

/// Windowed metrics aggregator.
///
/// Owns the trailing window and turns it into [`MetricSnapshot`]s. The
/// reference instant only ever moves forward, whichever [`TimeBasis`] is in
/// use.
pub struct WindowAggregator {
    window: EventWindow,
    basis: TimeBasis,
    clock: Arc<dyn Clock>,
    watermark: Option<DateTime<Utc>>,
    late_dropped: u64,
}

impl WindowAggregator {
    pub fn new(span: TimeDelta, basis: TimeBasis, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: EventWindow::new(span),
            basis,
            clock,
            watermark: None,
            late_dropped: 0,
        }
    }

    /// Event-time aggregator; the clock is only used before the first event.
    pub fn event_time(span: TimeDelta) -> Self {
        Self::new(span, TimeBasis::EventTime, Arc::new(SystemClock))
    }

    pub fn span(&self) -> TimeDelta {
        self.window.span()
    }

    pub fn basis(&self) -> TimeBasis {
        self.basis
    }

    /// Events currently held, including any not yet evicted.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Events refused because they were already outside the window.
    pub fn late_dropped(&self) -> u64 {
        self.late_dropped
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.window.iter()
    }

    /// The instant window ages are measured from right now.
    pub fn reference_time(&self) -> DateTime<Utc> {
        match (self.basis, self.watermark) {
            (TimeBasis::WallClock, Some(mark)) => mark.max(self.clock.now()),
            (TimeBasis::WallClock, None) => self.clock.now(),
            (TimeBasis::EventTime, Some(mark)) => mark,
            (TimeBasis::EventTime, None) => self.clock.now(),
        }
    }

    fn raise_watermark(&mut self, candidate: DateTime<Utc>) -> DateTime<Utc> {
        let mark = match self.watermark {
            Some(current) if current >= candidate => current,
            _ => candidate,
        };
        self.watermark = Some(mark);
        mark
    }

    /// Admit `event`, evict what aged out, and snapshot the result.
    pub fn ingest(&mut self, event: Event) -> MetricSnapshot {
        let candidate = match self.basis {
            TimeBasis::WallClock => self.clock.now(),
            TimeBasis::EventTime => event.timestamp,
        };
        let reference = self.raise_watermark(candidate);

        if self.window.is_expired(event.timestamp, reference) {
            self.late_dropped += 1;
            debug!(
                event_ts = %event.timestamp,
                reference = %reference,
                "event older than window, not admitted"
            );
        } else {
            self.window.push(event);
        }

        let evicted = self.window.evict(reference);
        trace!(evicted, held = self.window.len(), "window evicted");

        MetricSnapshot::compute(reference, self.window.span(), self.window.iter())
    }

    /// Move time forward to `now` and evict. Returns the number evicted.
    pub fn advance(&mut self, now: DateTime<Utc>) -> usize {
        let reference = self.raise_watermark(now);
        let evicted = self.window.evict(reference);
        if evicted > 0 {
            trace!(evicted, held = self.window.len(), "window advanced");
        }
        evicted
    }

    /// Read-only snapshot at the current reference time.
    pub fn snapshot(&self) -> MetricSnapshot {
        let reference = self.reference_time();
        MetricSnapshot::compute(reference, self.window.span(), self.window.live(reference))
    }
}

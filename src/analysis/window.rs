//! Trailing time window over ingested events.

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};

use crate::event::Event;

/// Events from the last `span`, kept in arrival order.
///
/// Every retained event satisfies `reference - timestamp <= span` once
/// [`EventWindow::evict`] has run for `reference`.
#[derive(Debug, Clone)]
pub struct EventWindow {
    span: TimeDelta,
    events: VecDeque<Event>,
    /// Set when an event arrived with an older timestamp than its predecessor.
    disordered: bool,
}

impl EventWindow {
    pub fn new(span: TimeDelta) -> Self {
        Self {
            span,
            events: VecDeque::new(),
            disordered: false,
        }
    }

    pub fn span(&self) -> TimeDelta {
        self.span
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Older than `span` relative to `reference`.
    pub fn is_expired(&self, timestamp: DateTime<Utc>, reference: DateTime<Utc>) -> bool {
        reference - timestamp > self.span
    }

    /// Append at the back. No eviction happens here.
    pub fn push(&mut self, event: Event) {
        if let Some(last) = self.events.back() {
            if event.timestamp < last.timestamp {
                self.disordered = true;
            }
        }
        self.events.push_back(event);
    }

    /// Drop expired events, oldest arrival first. Returns how many left.
    pub fn evict(&mut self, reference: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        while let Some(front) = self.events.front() {
            if !self.is_expired(front.timestamp, reference) {
                break;
            }
            self.events.pop_front();
            evicted += 1;
        }

        // A straggler can sit behind fresher events; sweep it out in place.
        if self.disordered {
            let span = self.span;
            let before = self.events.len();
            self.events.retain(|e| reference - e.timestamp <= span);
            evicted += before - self.events.len();
            self.disordered = self
                .events
                .iter()
                .zip(self.events.iter().skip(1))
                .any(|(a, b)| b.timestamp < a.timestamp);
        }

        evicted
    }

    /// Events still inside the window as seen from `reference`, without mutating.
    pub fn live(&self, reference: DateTime<Utc>) -> impl Iterator<Item = &Event> {
        let span = self.span;
        self.events
            .iter()
            .filter(move |e| reference - e.timestamp <= span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use chrono::TimeZone;

    fn at(secs: i64, session: &str) -> Event {
        let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        Event::new(ts, session, "c", EventType::PageView)
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_evicts_from_front_in_arrival_order() {
        let mut w = EventWindow::new(TimeDelta::seconds(10));
        for (i, s) in [0, 5, 12, 15].iter().enumerate() {
            w.push(at(*s, &format!("s{i}")));
        }
        let evicted = w.evict(ts(20));
        assert_eq!(evicted, 2);
        let left: Vec<_> = w.iter().map(|e| e.session_id.as_str()).collect();
        assert_eq!(left, vec!["s2", "s3"]);
    }

    #[test]
    fn test_boundary_age_is_kept() {
        let mut w = EventWindow::new(TimeDelta::seconds(10));
        w.push(at(0, "a"));
        assert_eq!(w.evict(ts(10)), 0);
        assert_eq!(w.evict(ts(11)), 1);
        assert!(w.is_empty());
    }

    #[test]
    fn test_same_timestamp_keeps_arrival_order() {
        let mut w = EventWindow::new(TimeDelta::seconds(10));
        w.push(at(3, "first"));
        w.push(at(3, "second"));
        w.push(at(4, "third"));
        w.evict(ts(13));
        let left: Vec<_> = w.iter().map(|e| e.session_id.as_str()).collect();
        assert_eq!(left, vec!["third"]);
    }

    #[test]
    fn test_straggler_is_swept() {
        let mut w = EventWindow::new(TimeDelta::seconds(10));
        w.push(at(10, "a"));
        w.push(at(4, "late"));
        w.push(at(12, "b"));
        w.evict(ts(15));
        let left: Vec<_> = w.iter().map(|e| e.session_id.as_str()).collect();
        assert_eq!(left, vec!["a", "b"]);
    }

    #[test]
    fn test_live_filters_without_mutating() {
        let mut w = EventWindow::new(TimeDelta::seconds(10));
        w.push(at(0, "old"));
        w.push(at(8, "new"));
        assert_eq!(w.live(ts(15)).count(), 1);
        assert_eq!(w.len(), 2);
    }
}

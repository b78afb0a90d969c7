//! Bounded snapshot history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::snapshot::MetricSnapshot;

/// Fixed-capacity ring of past snapshots, oldest first.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    capacity: usize,
    entries: VecDeque<MetricSnapshot>,
}

impl SnapshotHistory {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append, dropping the oldest entry when full.
    pub fn push(&mut self, snapshot: MetricSnapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, MetricSnapshot> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&MetricSnapshot> {
        self.entries.back()
    }

    /// Snapshots strictly newer than `cutoff`, oldest first.
    pub fn since(&self, cutoff: DateTime<Utc>) -> Vec<MetricSnapshot> {
        self.entries
            .iter()
            .filter(|s| s.timestamp > cutoff)
            .cloned()
            .collect()
    }
}

impl<'a> IntoIterator for &'a SnapshotHistory {
    type Item = &'a MetricSnapshot;
    type IntoIter = std::collections::vec_deque::Iter<'a, MetricSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

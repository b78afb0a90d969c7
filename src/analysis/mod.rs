//! Windowed funnel metrics: the trailing event window, the snapshots derived
//! from it, and the bounded history of past snapshots.

pub mod aggregator;
pub mod history;
pub mod snapshot;
pub mod window;

pub use aggregator::{Clock, SystemClock, TimeBasis, WindowAggregator};
pub use history::SnapshotHistory;
pub use snapshot::MetricSnapshot;

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::analysis::TimeBasis;
use crate::event::RawEvent;
use crate::pipeline::EngineHandle;
use crate::source::EventSource;

/// Pull events from `source` at `events_per_second` and push them into `tx`.
///
/// Stops when the source runs dry, `limit` events have been sent, or the
/// consumer hangs up. Returns the number sent.
pub async fn run_producer<S: EventSource>(
    mut source: S,
    tx: mpsc::Sender<RawEvent>,
    events_per_second: f64,
    limit: Option<u64>,
) -> u64 {
    let period = match Duration::try_from_secs_f64(1.0 / events_per_second) {
        Ok(period) if !period.is_zero() => period,
        _ => {
            warn!(events_per_second, "unusable event rate, producer not started");
            return 0;
        }
    };
    info!(events_per_second, "event producer started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut sent = 0u64;
    loop {
        if limit.is_some_and(|max| sent >= max) {
            break;
        }
        interval.tick().await;

        let raw = match source.next_event() {
            Some(Ok(raw)) => raw,
            Some(Err(e)) => {
                warn!(error = %e, "source produced an unreadable record, skipping");
                continue;
            }
            None => {
                info!(sent, "event source exhausted");
                break;
            }
        };

        if tx.send(raw).await.is_err() {
            debug!(sent, "consumer gone, producer stopping");
            break;
        }
        sent += 1;
    }

    sent
}

/// Single consumer: the only task that feeds the engine.
///
/// Invalid events are logged and skipped. On wall-clock time every `tick`
/// also advances the window so it drains while traffic is quiet. Returns
/// when the channel closes.
pub async fn run_consumer(
    mut rx: mpsc::Receiver<RawEvent>,
    handle: EngineHandle,
    tick: Duration,
    basis: TimeBasis,
) {
    info!(?basis, "ingest consumer started");

    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            maybe = rx.recv() => {
                let Some(raw) = maybe else {
                    info!("event channel closed, consumer stopping");
                    break;
                };
                match handle.ingest(raw).await {
                    Ok(outcome) => {
                        trace!(
                            total_events = outcome.snapshot.total_events,
                            conversion_rate = outcome.snapshot.conversion_rate,
                            alerts = outcome.alerts.len(),
                            "event ingested"
                        );
                    }
                    Err(e) => warn!(error = %e, "invalid event skipped"),
                }
            }
            _ = ticker.tick() => {
                if basis == TimeBasis::WallClock {
                    let evicted = handle.advance(Utc::now()).await;
                    if evicted > 0 {
                        debug!(evicted, "tick evicted expired events");
                    }
                }
            }
        }
    }
}

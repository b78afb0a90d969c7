//! funnelpulse -- real-time e-commerce funnel metrics with rolling anomaly
//! detection.
//!
//! Events flow into a trailing time window; every ingestion yields a
//! [`analysis::MetricSnapshot`] that is checked against recent history by the
//! [`detect::AnomalyDetector`]. The [`pipeline::StreamEngine`] owns all of it
//! and is driven by whoever constructs it: the async ingest loop in
//! [`scheduler`], a replay, or a test.

pub mod analysis;
pub mod api;
pub mod config;
pub mod detect;
pub mod event;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod source;

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::analysis::TimeBasis;
use crate::config::AppConfig;
use crate::pipeline::{EngineHandle, StreamEngine};
use crate::report::RunSummary;
use crate::source::{EventSource, ReplaySource, SyntheticEventSource};

/// Spawn the synthetic producer and the ingest consumer for `handle`.
fn spawn_ingest(
    config: &AppConfig,
    handle: EngineHandle,
) -> (tokio::task::JoinHandle<u64>, tokio::task::JoinHandle<()>) {
    let sim = &config.simulation;
    let (tx, rx) = mpsc::channel(sim.channel_capacity);
    let source = SyntheticEventSource::new(sim.seed, sim.session_pool);

    let producer = tokio::spawn(scheduler::run_producer(source, tx, sim.events_per_second, None));
    let consumer = tokio::spawn(scheduler::run_consumer(
        rx,
        handle,
        Duration::from_millis(sim.tick_millis.max(1)),
        config.window.time_basis,
    ));
    (producer, consumer)
}

/// Start the daemon: synthetic event stream, ingest loop, and HTTP API.
pub async fn serve(config: &AppConfig) -> Result<()> {
    let handle = EngineHandle::new(StreamEngine::with_system_clock(config));
    let (producer, consumer) = spawn_ingest(config, handle.clone());

    let addr: std::net::SocketAddr = config
        .api
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.api.bind))?;
    let app = api::router(api::state::AppState::new(handle.clone()));

    info!(%addr, "funnelpulse listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    producer.abort();
    let _ = producer.await;
    consumer.await.context("ingest consumer panicked")?;
    let stats = handle.stats().await;
    info!(ingested = stats.ingested, alerts = stats.alerts_raised, "funnelpulse stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Run the synthetic stream for `duration` and return the run summary.
///
/// With `live` set, a status line and any new alerts are printed every
/// `simulation.status_every_secs`.
pub async fn simulate(config: &AppConfig, duration: Duration, live: bool) -> Result<RunSummary> {
    let handle = EngineHandle::new(StreamEngine::with_system_clock(config));
    let (producer, consumer) = spawn_ingest(config, handle.clone());
    info!(
        seconds = duration.as_secs_f64(),
        events_per_second = config.simulation.events_per_second,
        "simulation started"
    );

    let started = Instant::now();
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let mut status = tokio::time::interval(Duration::from_secs(
        config.simulation.status_every_secs.max(1),
    ));
    // The first tick fires immediately, before any traffic.
    status.tick().await;

    let mut alerts = Vec::new();
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = status.tick() => {
                let metrics = handle.current_metrics().await;
                if live {
                    println!("{}", report::format_status(&metrics));
                }
                for alert in handle.drain_alerts().await {
                    if live {
                        println!("   {}", report::format_alert(&alert));
                    }
                    alerts.push(alert);
                }
            }
        }
    }

    // Dropping the producer closes the channel; the consumer drains and exits.
    producer.abort();
    let _ = producer.await;
    consumer.await.context("ingest consumer panicked")?;

    alerts.extend(handle.drain_alerts().await);
    let final_metrics = handle.current_metrics().await;
    let engine = handle
        .into_inner()
        .context("engine handle still shared after shutdown")?;

    Ok(RunSummary {
        mode: "simulate".to_string(),
        duration_secs: started.elapsed().as_secs_f64(),
        stats: engine.dispose(),
        source_errors: 0,
        final_metrics,
        alerts,
    })
}

/// Replay a JSON-lines event file on event time and return the run summary.
///
/// Invalid and unreadable records are logged and skipped; they show up in
/// the summary counts.
pub fn replay(config: &AppConfig, path: &Path) -> Result<RunSummary> {
    let mut config = config.clone();
    config.window.time_basis = TimeBasis::EventTime;

    let mut source = ReplaySource::open(path)
        .with_context(|| format!("failed to open replay file: {}", path.display()))?;
    let mut engine = StreamEngine::with_system_clock(&config);
    let started = Instant::now();

    let mut source_errors = 0u64;
    let mut alerts = Vec::new();
    while let Some(next) = source.next_event() {
        match next {
            Ok(raw) => match engine.ingest(raw) {
                Ok(outcome) => alerts.extend(outcome.alerts),
                Err(e) => warn!(error = %e, "invalid event skipped"),
            },
            Err(e) => {
                source_errors += 1;
                warn!(error = %e, "unreadable record skipped");
            }
        }
    }

    // Alerts were collected from each outcome; clear the queue.
    engine.get_alerts();
    let final_metrics = engine.snapshot();

    Ok(RunSummary {
        mode: "replay".to_string(),
        duration_secs: started.elapsed().as_secs_f64(),
        stats: engine.dispose(),
        source_errors,
        final_metrics,
        alerts,
    })
}

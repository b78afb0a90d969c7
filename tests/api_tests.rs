//! HTTP API tests -- drive the router in-process with `oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeDelta, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use funnelpulse::analysis::TimeBasis;
use funnelpulse::api::{router, state::AppState};
use funnelpulse::config::AppConfig;
use funnelpulse::event::{EventType, RawEvent};
use funnelpulse::pipeline::{EngineHandle, StreamEngine};

fn handle() -> EngineHandle {
    let mut cfg = AppConfig::default();
    cfg.window.time_basis = TimeBasis::EventTime;
    cfg.detector.minimum_history = 3;
    EngineHandle::new(StreamEngine::with_system_clock(&cfg))
}

fn raw(secs: i64, session: &str, event_type: EventType, revenue: Option<f64>) -> RawEvent {
    let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + TimeDelta::seconds(secs);
    RawEvent {
        timestamp: Some(ts.to_rfc3339()),
        session_id: Some(session.to_string()),
        customer_id: Some("c1".to_string()),
        event_type: Some(event_type.to_string()),
        device_type: Some("desktop".to_string()),
        channel: Some("organic".to_string()),
        revenue,
        ..Default::default()
    }
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let app = router(AppState::new(handle()));
    let (status, body) = get_json(&app, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert!(body["meta"]["timestamp"].is_string());
}

#[tokio::test]
async fn test_current_metrics_envelope() {
    let engine = handle();
    engine.ingest(raw(0, "s1", EventType::PageView, None)).await.unwrap();
    engine
        .ingest(raw(5, "s1", EventType::Purchase, Some(50.0)))
        .await
        .unwrap();

    let app = router(AppState::new(engine));
    let (status, body) = get_json(&app, "/api/v1/metrics/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_events"], 2);
    assert_eq!(body["data"]["purchases"], 1);
    assert_eq!(body["data"]["conversion_rate"], 100.0);
    assert_eq!(body["data"]["event_breakdown"]["purchase"], 1);
}

#[tokio::test]
async fn test_history_window() {
    let engine = handle();
    for i in 0..10 {
        engine
            .ingest(raw(i * 60, "s1", EventType::PageView, None))
            .await
            .unwrap();
    }
    let app = router(AppState::new(engine));

    let (_, body) = get_json(&app, "/api/v1/metrics/history?minutes=3").await;
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (_, body) = get_json(&app, "/api/v1/metrics/history").await;
    assert_eq!(body["meta"]["minutes"], 60);
    assert_eq!(body["meta"]["total"], 10);
}

#[tokio::test]
async fn test_alerts_drain_once() {
    let engine = handle();
    // One purchase per window with steady order values, then an outlier.
    for i in 0..5 {
        let revenue = 40.0 + i as f64;
        engine
            .ingest(raw(i * 100, &format!("s{i}"), EventType::Purchase, Some(revenue)))
            .await
            .unwrap();
    }
    engine
        .ingest(raw(500, "big", EventType::Purchase, Some(1000.0)))
        .await
        .unwrap();
    let pending = engine.stats().await.alerts_pending;
    assert!(pending > 0);

    let app = router(AppState::new(engine));
    let (status, body) = get_json(&app, "/api/v1/alerts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], pending);
    assert!(body["data"][0]["recommended_action"].is_string());

    let (_, body) = get_json(&app, "/api/v1/alerts").await;
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
async fn test_stats_counts_rejections() {
    let engine = handle();
    assert!(engine.ingest(RawEvent::default()).await.is_err());
    let app = router(AppState::new(engine));

    let (_, body) = get_json(&app, "/api/v1/stats").await;
    assert_eq!(body["data"]["rejected"], 1);
    assert_eq!(body["data"]["ingested"], 0);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = router(AppState::new(handle()));
    let (status, _) = get_json(&app, "/api/v1/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

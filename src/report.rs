//! Plain-text rendering of live status and run summaries.

use serde::Serialize;

use crate::analysis::MetricSnapshot;
use crate::detect::Alert;
use crate::event::EventType;
use crate::pipeline::EngineStats;

/// Outcome of a bounded `simulate` or `replay` run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: String,
    pub duration_secs: f64,
    pub stats: EngineStats,
    pub source_errors: u64,
    pub final_metrics: MetricSnapshot,
    pub alerts: Vec<Alert>,
}

/// One status line: throughput, conversion, revenue rate, sessions.
pub fn format_status(s: &MetricSnapshot) -> String {
    format!(
        "{} | events/sec {:>6.2} | conversion {:>6.2}% | revenue/sec ${:>8.2} | sessions {:>5}",
        s.timestamp.format("%H:%M:%S"),
        s.events_per_second,
        s.conversion_rate,
        s.revenue_per_second,
        s.unique_sessions,
    )
}

pub fn format_alert(alert: &Alert) -> String {
    format!("ALERT {} -> {}", alert.summary(), alert.recommended_action)
}

/// Funnel counts, page view first.
pub fn format_funnel(s: &MetricSnapshot) -> String {
    EventType::FUNNEL
        .iter()
        .map(|t| format!("{} {}", t, s.count(*t)))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Multi-line end-of-run report.
pub fn format_summary(summary: &RunSummary) -> String {
    let m = &summary.final_metrics;
    let st = &summary.stats;
    let rule = "=".repeat(60);

    let mut out = String::new();
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!(
        "FUNNEL ANALYTICS SUMMARY ({}, {:.0}s)\n",
        summary.mode, summary.duration_secs
    ));
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("Events ingested:        {}\n", st.ingested));
    out.push_str(&format!("Events rejected:        {}\n", st.rejected));
    if st.late_dropped > 0 {
        out.push_str(&format!("Late events dropped:    {}\n", st.late_dropped));
    }
    if summary.source_errors > 0 {
        out.push_str(&format!("Unreadable records:     {}\n", summary.source_errors));
    }
    out.push_str(&format!("Events in window:       {}\n", m.total_events));
    out.push_str(&format!("Active sessions:        {}\n", m.unique_sessions));
    out.push_str(&format!("Conversion rate:        {:.3}%\n", m.conversion_rate));
    out.push_str(&format!("Cart conversion:        {:.3}%\n", m.cart_conversion_rate));
    out.push_str(&format!("Checkout conversion:    {:.3}%\n", m.checkout_conversion_rate));
    out.push_str(&format!("Window revenue:         ${:.2}\n", m.total_revenue));
    out.push_str(&format!("Average order value:    ${:.2}\n", m.avg_order_value));
    out.push_str(&format!("Events/second:          {:.2}\n", m.events_per_second));
    out.push_str(&format!("Funnel:                 {}\n", format_funnel(m)));
    out.push_str(&format!(
        "Alerts raised:          {} ({} high)\n",
        st.alerts_raised,
        summary
            .alerts
            .iter()
            .filter(|a| a.severity == crate::detect::Severity::High)
            .count()
    ));
    for alert in &summary.alerts {
        out.push_str(&format!("  - {}\n", format_alert(alert)));
    }
    out.push_str(&rule);
    out
}

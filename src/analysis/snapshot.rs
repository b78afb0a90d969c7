use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventType};

/// Point-in-time metrics over the window. Ratios are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub timestamp: DateTime<Utc>,
    pub window_seconds: f64,
    pub total_events: u64,
    pub unique_sessions: u64,
    pub unique_customers: u64,
    pub events_per_second: f64,
    pub event_breakdown: BTreeMap<EventType, u64>,

    /// purchases / sessions
    pub conversion_rate: f64,
    /// purchases / cart adds
    pub cart_conversion_rate: f64,
    /// purchases / checkout starts
    pub checkout_conversion_rate: f64,
    pub cart_abandonment_rate: f64,

    pub purchases: u64,
    pub total_revenue: f64,
    pub avg_order_value: f64,
    pub revenue_per_second: f64,

    pub device_breakdown: BTreeMap<String, u64>,
    pub channel_breakdown: BTreeMap<String, u64>,
    pub country_breakdown: BTreeMap<String, u64>,
}

/// `num / den` as a percentage, 0 on an empty denominator.
fn percent(num: u64, den: u64) -> f64 {
    if den == 0 {
        return 0.0;
    }
    num as f64 / den as f64 * 100.0
}

fn per_second(value: f64, seconds: f64) -> f64 {
    if seconds <= 0.0 {
        return 0.0;
    }
    value / seconds
}

impl MetricSnapshot {
    /// Snapshot of an empty window: every count and ratio is zero.
    pub fn empty(timestamp: DateTime<Utc>, window: TimeDelta) -> Self {
        Self::compute(timestamp, window, std::iter::empty())
    }

    /// One pass over `events`.
    pub fn compute<'a, I>(timestamp: DateTime<Utc>, window: TimeDelta, events: I) -> Self
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let window_seconds = window.num_milliseconds() as f64 / 1000.0;

        let mut total_events = 0u64;
        let mut sessions: HashSet<&str> = HashSet::new();
        let mut customers: HashSet<&str> = HashSet::new();
        let mut event_breakdown: BTreeMap<EventType, u64> = BTreeMap::new();
        let mut device_breakdown: BTreeMap<String, u64> = BTreeMap::new();
        let mut channel_breakdown: BTreeMap<String, u64> = BTreeMap::new();
        let mut country_breakdown: BTreeMap<String, u64> = BTreeMap::new();
        let mut total_revenue = 0.0;
        let mut paid_orders = 0u64;

        for event in events {
            total_events += 1;
            sessions.insert(event.session_id.as_str());
            customers.insert(event.customer_id.as_str());
            *event_breakdown.entry(event.event_type).or_default() += 1;
            *device_breakdown.entry(event.device_type.clone()).or_default() += 1;
            *channel_breakdown.entry(event.channel.clone()).or_default() += 1;
            if let Some(country) = &event.country {
                *country_breakdown.entry(country.clone()).or_default() += 1;
            }
            if event.event_type == EventType::Purchase {
                if let Some(revenue) = event.revenue {
                    total_revenue += revenue;
                    paid_orders += 1;
                }
            }
        }

        let count = |t: EventType| event_breakdown.get(&t).copied().unwrap_or(0);
        let purchases = count(EventType::Purchase);
        let cart_adds = count(EventType::AddToCart);
        let checkouts = count(EventType::CheckoutStart);
        let unique_sessions = sessions.len() as u64;

        let cart_abandonment_rate = if cart_adds == 0 {
            0.0
        } else {
            (100.0 - percent(purchases, cart_adds)).max(0.0)
        };

        let avg_order_value = if paid_orders == 0 {
            0.0
        } else {
            total_revenue / paid_orders as f64
        };

        Self {
            timestamp,
            window_seconds,
            total_events,
            unique_sessions,
            unique_customers: customers.len() as u64,
            events_per_second: per_second(total_events as f64, window_seconds),
            conversion_rate: percent(purchases, unique_sessions),
            cart_conversion_rate: percent(purchases, cart_adds),
            checkout_conversion_rate: percent(purchases, checkouts),
            cart_abandonment_rate,
            purchases,
            total_revenue,
            avg_order_value,
            revenue_per_second: per_second(total_revenue, window_seconds),
            event_breakdown,
            device_breakdown,
            channel_breakdown,
            country_breakdown,
        }
    }

    /// Events of type `t` in the window.
    pub fn count(&self, t: EventType) -> u64 {
        self.event_breakdown.get(&t).copied().unwrap_or(0)
    }
}

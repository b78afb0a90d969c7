//! Interaction events -- the raw wire shape and the validated record.
//!
//! Sources hand the engine [`RawEvent`]s. Validation turns them into
//! [`Event`]s or rejects them with an [`InvalidEventError`] before anything
//! touches the window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Funnel stage of an interaction, in funnel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    ProductView,
    AddToCart,
    CheckoutStart,
    Purchase,
}

impl EventType {
    /// All stages, page view first.
    pub const FUNNEL: [EventType; 5] = [
        EventType::PageView,
        EventType::ProductView,
        EventType::AddToCart,
        EventType::CheckoutStart,
        EventType::Purchase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PageView => "page_view",
            EventType::ProductView => "product_view",
            EventType::AddToCart => "add_to_cart",
            EventType::CheckoutStart => "checkout_start",
            EventType::Purchase => "purchase",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = InvalidEventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page_view" => Ok(EventType::PageView),
            "product_view" => Ok(EventType::ProductView),
            "add_to_cart" => Ok(EventType::AddToCart),
            "checkout_start" => Ok(EventType::CheckoutStart),
            "purchase" => Ok(EventType::Purchase),
            other => Err(InvalidEventError::UnknownEventType(other.to_string())),
        }
    }
}

/// Why an incoming event was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidEventError {
    #[error("unknown event type '{0}'")]
    UnknownEventType(String),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },
    #[error("invalid revenue amount {0}")]
    InvalidRevenue(f64),
    #[error("revenue present on non-purchase event '{0}'")]
    RevenueOnNonPurchase(EventType),
}

/// An event as it arrives from a source: nothing is trusted yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// RFC 3339 instant.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// A validated interaction record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub customer_id: String,
    pub event_type: EventType,
    pub device_type: String,
    pub channel: String,
    /// Order value; only ever set on purchases.
    pub revenue: Option<f64>,
    pub event_id: Option<String>,
    pub product_id: Option<String>,
    pub country: Option<String>,
}

impl Event {
    /// Build a minimal event. Device and channel default to `unknown`.
    pub fn new(
        timestamp: DateTime<Utc>,
        session_id: impl Into<String>,
        customer_id: impl Into<String>,
        event_type: EventType,
    ) -> Self {
        Self {
            timestamp,
            session_id: session_id.into(),
            customer_id: customer_id.into(),
            event_type,
            device_type: "unknown".to_string(),
            channel: "unknown".to_string(),
            revenue: None,
            event_id: None,
            product_id: None,
            country: None,
        }
    }

    pub fn with_device(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_revenue(mut self, revenue: f64) -> Self {
        self.revenue = Some(revenue);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Check the invariants a hand-built event must satisfy.
    pub fn validate(&self) -> Result<(), InvalidEventError> {
        if self.session_id.trim().is_empty() {
            return Err(InvalidEventError::MissingField("session_id"));
        }
        if self.customer_id.trim().is_empty() {
            return Err(InvalidEventError::MissingField("customer_id"));
        }
        if self.device_type.trim().is_empty() {
            return Err(InvalidEventError::MissingField("device_type"));
        }
        if self.channel.trim().is_empty() {
            return Err(InvalidEventError::MissingField("channel"));
        }
        if let Some(revenue) = self.revenue {
            if !revenue.is_finite() || revenue < 0.0 {
                return Err(InvalidEventError::InvalidRevenue(revenue));
            }
            if self.event_type != EventType::Purchase {
                return Err(InvalidEventError::RevenueOnNonPurchase(self.event_type));
            }
        }
        Ok(())
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, InvalidEventError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(InvalidEventError::MissingField(field)),
    }
}

impl TryFrom<RawEvent> for Event {
    type Error = InvalidEventError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let event_type: EventType = required(raw.event_type, "event_type")?.parse()?;

        let ts_str = required(raw.timestamp, "timestamp")?;
        let timestamp = DateTime::parse_from_rfc3339(&ts_str)
            .map_err(|e| InvalidEventError::InvalidTimestamp {
                value: ts_str.clone(),
                reason: e.to_string(),
            })?
            .with_timezone(&Utc);

        let event = Event {
            timestamp,
            session_id: required(raw.session_id, "session_id")?,
            customer_id: required(raw.customer_id, "customer_id")?,
            event_type,
            device_type: required(raw.device_type, "device_type")?,
            channel: required(raw.channel, "channel")?,
            revenue: raw.revenue,
            event_id: raw.event_id,
            product_id: raw.product_id,
            country: raw.country,
        };
        event.validate()?;
        Ok(event)
    }
}

impl From<&Event> for RawEvent {
    fn from(e: &Event) -> Self {
        Self {
            event_id: e.event_id.clone(),
            timestamp: Some(e.timestamp.to_rfc3339()),
            session_id: Some(e.session_id.clone()),
            customer_id: Some(e.customer_id.clone()),
            event_type: Some(e.event_type.as_str().to_string()),
            device_type: Some(e.device_type.clone()),
            channel: Some(e.channel.clone()),
            revenue: e.revenue,
            product_id: e.product_id.clone(),
            country: e.country.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_purchase() -> RawEvent {
        RawEvent {
            event_id: Some("evt_1".into()),
            timestamp: Some("2026-03-01T12:00:00Z".into()),
            session_id: Some("sess_1".into()),
            customer_id: Some("42".into()),
            event_type: Some("purchase".into()),
            device_type: Some("mobile".into()),
            channel: Some("email".into()),
            revenue: Some(73.5),
            product_id: None,
            country: Some("US".into()),
        }
    }

    #[test]
    fn test_valid_raw_event_converts() {
        let event = Event::try_from(raw_purchase()).unwrap();
        assert_eq!(event.event_type, EventType::Purchase);
        assert_eq!(event.revenue, Some(73.5));
        assert_eq!(event.timestamp.to_rfc3339(), "2026-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let mut raw = raw_purchase();
        raw.event_type = Some("wishlist_add".into());
        assert_eq!(
            Event::try_from(raw),
            Err(InvalidEventError::UnknownEventType("wishlist_add".into()))
        );
    }

    #[test]
    fn test_missing_timestamp_rejected() {
        let mut raw = raw_purchase();
        raw.timestamp = None;
        assert_eq!(
            Event::try_from(raw),
            Err(InvalidEventError::MissingField("timestamp"))
        );
    }

    #[test]
    fn test_garbage_timestamp_rejected() {
        let mut raw = raw_purchase();
        raw.timestamp = Some("yesterday".into());
        assert!(matches!(
            Event::try_from(raw),
            Err(InvalidEventError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_revenue_rules() {
        let mut negative = raw_purchase();
        negative.revenue = Some(-1.0);
        assert_eq!(
            Event::try_from(negative),
            Err(InvalidEventError::InvalidRevenue(-1.0))
        );

        let mut on_view = raw_purchase();
        on_view.event_type = Some("page_view".into());
        assert_eq!(
            Event::try_from(on_view),
            Err(InvalidEventError::RevenueOnNonPurchase(EventType::PageView))
        );
    }

    #[test]
    fn test_blank_identifiers_rejected_on_both_paths() {
        let ts = Utc::now();
        let built = Event::new(ts, "  ", "42", EventType::PageView);
        assert_eq!(built.validate(), Err(InvalidEventError::MissingField("session_id")));

        let built = Event::new(ts, "sess_1", "42", EventType::PageView).with_channel("\t");
        assert_eq!(built.validate(), Err(InvalidEventError::MissingField("channel")));

        let mut raw = raw_purchase();
        raw.session_id = Some("  ".into());
        assert_eq!(
            Event::try_from(raw),
            Err(InvalidEventError::MissingField("session_id"))
        );
    }

    #[test]
    fn test_raw_event_parses_from_json_line() {
        let line = r#"{"timestamp":"2026-03-01T12:00:01Z","session_id":"s","customer_id":"c","event_type":"add_to_cart","device_type":"desktop","channel":"organic"}"#;
        let raw: RawEvent = serde_json::from_str(line).unwrap();
        let event = Event::try_from(raw).unwrap();
        assert_eq!(event.event_type, EventType::AddToCart);
        assert!(event.revenue.is_none());
    }
}

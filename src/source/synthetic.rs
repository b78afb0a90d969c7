//! Weighted random funnel traffic.

use chrono::{DateTime, TimeDelta, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::LogNormal;

use crate::event::{Event, EventType, RawEvent};
use crate::source::{EventSource, SourceError};

static EVENT_WEIGHTS: [(EventType, f64); 5] = [
    (EventType::PageView, 0.45),
    (EventType::ProductView, 0.25),
    (EventType::AddToCart, 0.15),
    (EventType::CheckoutStart, 0.10),
    (EventType::Purchase, 0.05),
];

static CHANNELS: [(&str, f64); 5] = [
    ("organic", 0.35),
    ("paid_search", 0.25),
    ("social", 0.15),
    ("email", 0.15),
    ("direct", 0.10),
];

static DEVICES: [(&str, f64); 3] = [("desktop", 0.45), ("mobile", 0.45), ("tablet", 0.10)];

static COUNTRIES: [(&str, f64); 8] = [
    ("US", 0.40),
    ("UK", 0.15),
    ("CA", 0.12),
    ("AU", 0.08),
    ("DE", 0.08),
    ("FR", 0.06),
    ("ES", 0.06),
    ("IT", 0.05),
];

const CUSTOMERS: u32 = 10_000;
const PRODUCTS: u32 = 500;

/// Log-normal order value parameters.
const REVENUE_MU: f64 = 4.3;
const REVENUE_SIGMA: f64 = 0.7;

/// Chance an open session ends after a non-purchase event.
const SESSION_END_P: f64 = 0.08;

struct Session {
    id: String,
    customer_id: u32,
    device: &'static str,
    channel: &'static str,
    country: &'static str,
}

/// Picks one label by weight.
struct Weighted<T: Copy + 'static> {
    items: &'static [(T, f64)],
    index: WeightedIndex<f64>,
}

impl<T: Copy + 'static> Weighted<T> {
    fn new(items: &'static [(T, f64)]) -> Self {
        let index = WeightedIndex::new(items.iter().map(|(_, w)| *w))
            .expect("static weight tables are positive");
        Self { items, index }
    }

    fn pick(&self, rng: &mut StdRng) -> T {
        self.items[self.index.sample(rng)].0
    }
}

/// Endless stream of plausible funnel events.
///
/// Events are drawn from a pool of open sessions so session-level ratios
/// behave like real traffic; a session closes after a purchase or at random.
pub struct SyntheticEventSource {
    rng: StdRng,
    event_types: Weighted<EventType>,
    channels: Weighted<&'static str>,
    devices: Weighted<&'static str>,
    countries: Weighted<&'static str>,
    order_values: LogNormal<f64>,
    sessions: Vec<Session>,
    next_session: u64,
    next_event: u64,
    /// Synthetic clock; `None` stamps events with `Utc::now()`.
    stepped: Option<(DateTime<Utc>, TimeDelta)>,
}

impl SyntheticEventSource {
    pub fn new(seed: Option<u64>, session_pool: usize) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut source = Self {
            rng,
            event_types: Weighted::new(&EVENT_WEIGHTS),
            channels: Weighted::new(&CHANNELS),
            devices: Weighted::new(&DEVICES),
            countries: Weighted::new(&COUNTRIES),
            order_values: LogNormal::new(REVENUE_MU, REVENUE_SIGMA)
                .expect("order value sigma is positive"),
            sessions: Vec::new(),
            next_session: 0,
            next_event: 0,
            stepped: None,
        };
        for _ in 0..session_pool.max(1) {
            let session = source.open_session();
            source.sessions.push(session);
        }
        source
    }

    /// Stamp events from `start`, `step` apart, instead of the wall clock.
    pub fn with_stepped_clock(mut self, start: DateTime<Utc>, step: TimeDelta) -> Self {
        self.stepped = Some((start, step));
        self
    }

    fn open_session(&mut self) -> Session {
        self.next_session += 1;
        Session {
            id: format!("sess_{:07}", self.next_session),
            customer_id: self.rng.gen_range(1..=CUSTOMERS),
            device: self.devices.pick(&mut self.rng),
            channel: self.channels.pick(&mut self.rng),
            country: self.countries.pick(&mut self.rng),
        }
    }

    fn timestamp(&mut self) -> DateTime<Utc> {
        match &mut self.stepped {
            Some((next, step)) => {
                let ts = *next;
                *next += *step;
                ts
            }
            None => Utc::now(),
        }
    }

    /// Order value rounded to cents.
    fn order_value(&mut self) -> f64 {
        let value = self.order_values.sample(&mut self.rng);
        (value * 100.0).round() / 100.0
    }

    /// Produce the next event.
    pub fn generate(&mut self) -> Event {
        let slot = self.rng.gen_range(0..self.sessions.len());
        let event_type = self.event_types.pick(&mut self.rng);
        let timestamp = self.timestamp();
        self.next_event += 1;

        let session = &self.sessions[slot];
        let mut event = Event::new(
            timestamp,
            session.id.clone(),
            session.customer_id.to_string(),
            event_type,
        )
        .with_device(session.device)
        .with_channel(session.channel)
        .with_country(session.country);
        event.event_id = Some(format!("evt_{:09}", self.next_event));
        event.product_id = Some(format!("prod_{}", self.rng.gen_range(1..=PRODUCTS)));

        let closes = if event_type == EventType::Purchase {
            event.revenue = Some(self.order_value());
            true
        } else {
            self.rng.gen_bool(SESSION_END_P)
        };
        if closes {
            let fresh = self.open_session();
            self.sessions[slot] = fresh;
        }

        event
    }
}

impl EventSource for SyntheticEventSource {
    fn next_event(&mut self) -> Option<Result<RawEvent, SourceError>> {
        let event = self.generate();
        Some(Ok(RawEvent::from(&event)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_seeded_sources_are_deterministic() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let mut a = SyntheticEventSource::new(Some(11), 20)
            .with_stepped_clock(start, TimeDelta::milliseconds(200));
        let mut b = SyntheticEventSource::new(Some(11), 20)
            .with_stepped_clock(start, TimeDelta::milliseconds(200));
        for _ in 0..50 {
            assert_eq!(a.generate(), b.generate());
        }
    }

    #[test]
    fn test_generated_events_are_valid() {
        let mut source = SyntheticEventSource::new(Some(3), 50);
        for _ in 0..500 {
            let raw = source.next_event().unwrap().unwrap();
            let event = Event::try_from(raw).unwrap();
            match event.event_type {
                EventType::Purchase => assert!(event.revenue.unwrap() > 0.0),
                _ => assert!(event.revenue.is_none()),
            }
        }
    }

    #[test]
    fn test_order_values_center_on_lognormal_median() {
        let mut source = SyntheticEventSource::new(Some(21), 10);
        let mut values: Vec<f64> = (0..2001).map(|_| source.order_value()).collect();
        assert!(values.iter().all(|v| *v >= 0.0));
        values.sort_by(f64::total_cmp);
        // exp(4.3) ~ 73.7
        let median = values[1000];
        assert!((60.0..90.0).contains(&median), "median {median}");
    }

    #[test]
    fn test_stepped_clock_advances() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let mut source = SyntheticEventSource::new(Some(1), 5)
            .with_stepped_clock(start, TimeDelta::seconds(2));
        assert_eq!(source.generate().timestamp, start);
        assert_eq!(source.generate().timestamp, start + TimeDelta::seconds(2));
    }

    #[test]
    fn test_funnel_mix_roughly_matches_weights() {
        let mut source = SyntheticEventSource::new(Some(99), 100);
        let n = 20_000;
        let views = (0..n)
            .filter(|_| source.generate().event_type == EventType::PageView)
            .count();
        let share = views as f64 / n as f64;
        assert!((0.40..0.50).contains(&share), "page_view share {share}");
    }
}

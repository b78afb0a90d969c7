//! Caller-owned cadence: the producer task pulling from an event source and
//! the single consumer task feeding the engine.

pub mod engine;

pub use self::engine::{run_consumer, run_producer};

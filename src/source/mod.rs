//! Event sources feeding the engine.

pub mod replay;
pub mod synthetic;

pub use self::replay::ReplaySource;
pub use self::synthetic::SyntheticEventSource;

use thiserror::Error;

use crate::event::RawEvent;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read event stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: malformed event record: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Something that yields raw events until it runs dry.
pub trait EventSource: Send {
    /// `None` once the source is exhausted.
    fn next_event(&mut self) -> Option<Result<RawEvent, SourceError>>;
}

//! JSON-lines replay of recorded events.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use tracing::info;

use crate::event::RawEvent;
use crate::source::{EventSource, SourceError};

/// Reads one [`RawEvent`] per line. Blank lines are skipped; a line that is
/// not a JSON object of the right shape comes back as [`SourceError::Parse`]
/// and reading continues with the next line.
pub struct ReplaySource<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        info!(path = %path.display(), "replaying events");
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead + Send> EventSource for ReplaySource<R> {
    fn next_event(&mut self) -> Option<Result<RawEvent, SourceError>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(SourceError::Io(e))),
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(serde_json::from_str(trimmed).map_err(|source| SourceError::Parse {
                line: self.line_no,
                source,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_lines_and_skips_blanks() {
        let data = concat!(
            r#"{"timestamp":"2026-03-01T00:00:00Z","session_id":"a","customer_id":"1","event_type":"page_view","device_type":"mobile","channel":"email"}"#,
            "\n\n",
            "not json\n",
            r#"{"timestamp":"2026-03-01T00:00:01Z","event_type":"teleport"}"#,
            "\n",
        );
        let mut source = ReplaySource::from_reader(Cursor::new(data));

        let first = source.next_event().unwrap().unwrap();
        assert_eq!(first.session_id.as_deref(), Some("a"));

        match source.next_event() {
            Some(Err(SourceError::Parse { line, .. })) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }

        // Structurally fine; validation happens in the engine.
        let third = source.next_event().unwrap().unwrap();
        assert_eq!(third.event_type.as_deref(), Some("teleport"));

        assert!(source.next_event().is_none());
    }
}

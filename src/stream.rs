//! JSON Lines event streams.
//!
//! One [`PerfEvent`] per line, tagged by `kind`. Blank lines are skipped.

use crate::collector::types::PerfEvent;
use std::io::BufRead;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventStreamError {
    #[error("failed to read event stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid event on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Iterator over the events of a JSONL stream.
pub struct EventReader<R> {
    reader: R,
    line: usize,
    buffer: String,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buffer: String::new(),
        }
    }

    /// Line number of the last line read (1-based).
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<PerfEvent, EventStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    let trimmed = self.buffer.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(serde_json::from_str(trimmed).map_err(|source| {
                        EventStreamError::Parse {
                            line: self.line,
                            source,
                        }
                    }));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

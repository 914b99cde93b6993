//! Long-task observer.
//!
//! Normalizes batches of platform performance entries into
//! [`LongTaskEntry`] events. Entries of any other type are ignored.

use crate::collector::handle::{Listener, TrackerHandle};
use crate::collector::types::{LongTaskAttribution, LongTaskEntry};
use serde::{Deserialize, Serialize};

/// Entry type reported for main-thread stalls.
pub const LONG_TASK_ENTRY_TYPE: &str = "longtask";

/// A raw entry as delivered by the platform's performance observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEntry {
    pub name: String,
    pub entry_type: String,
    pub start_time: f64,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Vec<LongTaskAttribution>>,
}

pub struct LongTaskObserver {
    listener: Listener<LongTaskEntry>,
    handle: TrackerHandle,
}

impl LongTaskObserver {
    pub fn new(listener: Listener<LongTaskEntry>) -> Self {
        Self {
            listener,
            handle: TrackerHandle::new(),
        }
    }

    pub fn handle(&self) -> TrackerHandle {
        self.handle.clone()
    }

    /// Deliver one observer batch. Returns how many long tasks were emitted.
    pub fn observe(&self, entries: &[PerformanceEntry]) -> usize {
        if !self.handle.is_running() {
            return 0;
        }

        let mut emitted = 0;
        for entry in entries
            .iter()
            .filter(|entry| entry.entry_type == LONG_TASK_ENTRY_TYPE)
        {
            (self.listener)(LongTaskEntry {
                name: entry.name.clone(),
                duration: entry.duration,
                start_time: entry.start_time,
                attribution: entry.attribution.clone(),
            });
            emitted += 1;
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::handle::listener;
    use std::sync::{Arc, Mutex};

    fn entry(entry_type: &str, start_time: f64) -> PerformanceEntry {
        PerformanceEntry {
            name: "self".to_string(),
            entry_type: entry_type.to_string(),
            start_time,
            duration: 80.0,
            attribution: None,
        }
    }

    #[test]
    fn test_only_long_tasks_are_emitted() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = LongTaskObserver::new(listener(move |task: LongTaskEntry| {
            sink.lock().unwrap().push(task)
        }));

        let emitted = observer.observe(&[
            entry("longtask", 10.0),
            entry("paint", 20.0),
            entry("longtask", 200.0),
        ]);

        assert_eq!(emitted, 2);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].start_time, 10.0);
        assert_eq!(seen[1].end_time(), 280.0);
    }

    #[test]
    fn test_disconnected_observer_is_silent() {
        let observer = LongTaskObserver::new(listener(|_: LongTaskEntry| panic!("unexpected")));
        observer.handle().stop();
        assert_eq!(observer.observe(&[entry("longtask", 0.0)]), 0);
    }
}

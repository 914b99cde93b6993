//! Render-cost profiler callback.

use crate::collector::handle::{Listener, TrackerHandle};
use crate::collector::types::{RenderEntry, RenderPhase};

/// Receives profiler commits from the UI framework and emits
/// [`RenderEntry`] events.
pub struct RenderProfiler {
    listener: Listener<RenderEntry>,
    handle: TrackerHandle,
}

impl RenderProfiler {
    pub fn new(listener: Listener<RenderEntry>) -> Self {
        Self {
            listener,
            handle: TrackerHandle::new(),
        }
    }

    pub fn handle(&self) -> TrackerHandle {
        self.handle.clone()
    }

    /// Profiler callback. Arguments follow the framework's order: profiler
    /// id, phase, actual duration, base duration, start time, commit time.
    pub fn on_render(
        &self,
        id: &str,
        phase: RenderPhase,
        actual_duration: f64,
        base_duration: f64,
        start_time: f64,
        commit_time: f64,
    ) {
        if !self.handle.is_running() {
            return;
        }
        (self.listener)(RenderEntry {
            component: id.to_string(),
            actual_duration,
            base_duration,
            start_time,
            commit_time,
            phase,
        });
    }
}

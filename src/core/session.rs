//! Interaction-anchored performance sessions.
//!
//! A session is an immutable value. Landing an event in a session produces a
//! new session (`with_*`), which the store swaps in wholesale, so any snapshot
//! already handed out keeps seeing the old value.

use crate::collector::types::{FpsData, Interaction, LongTaskEntry, NetworkEntry, RenderEntry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded group of events caused by one interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSession {
    pub id: String,
    /// The triggering interaction
    pub interaction: Interaction,
    /// Render commits, in delivery order
    pub renders: Vec<RenderEntry>,
    /// Network round-trips, in delivery order
    pub network: Vec<NetworkEntry>,
    /// Main-thread stalls, in delivery order
    pub long_tasks: Vec<LongTaskEntry>,
    /// Frame-rate samples, in delivery order
    pub fps_samples: Vec<FpsData>,
    pub start_time: f64,
    /// Time of the last observed activity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
}

impl PerformanceSession {
    /// Start an empty session seeded by `interaction`.
    pub fn new(interaction: Interaction) -> Self {
        Self {
            id: session_id(&interaction),
            start_time: interaction.start_time,
            interaction,
            renders: Vec::new(),
            network: Vec::new(),
            long_tasks: Vec::new(),
            fps_samples: Vec::new(),
            end_time: None,
        }
    }

    pub fn with_render(&self, render: RenderEntry) -> Self {
        let mut next = self.clone();
        next.end_time = Some(render.commit_time);
        next.renders.push(render);
        next
    }

    pub fn with_network(&self, entry: NetworkEntry) -> Self {
        let mut next = self.clone();
        next.end_time = Some(entry.end_time);
        next.network.push(entry);
        next
    }

    pub fn with_long_task(&self, task: LongTaskEntry) -> Self {
        let mut next = self.clone();
        next.end_time = Some(task.end_time());
        next.long_tasks.push(task);
        next
    }

    pub fn with_fps_sample(&self, sample: FpsData) -> Self {
        let mut next = self.clone();
        next.end_time = Some(sample.timestamp);
        next.fps_samples.push(sample);
        next
    }

    /// Total number of correlated events (the interaction excluded).
    pub fn event_count(&self) -> usize {
        self.renders.len() + self.network.len() + self.long_tasks.len() + self.fps_samples.len()
    }

    /// Elapsed time from the interaction to the last activity, or to `now_ms`
    /// if nothing has landed yet.
    pub fn duration_ms(&self, now_ms: f64) -> f64 {
        self.end_time.unwrap_or(now_ms) - self.start_time
    }
}

/// Build a session id from the interaction id, its rounded start time and a
/// random v4 UUID. The UUID keeps ids unique even for identical interactions
/// observed in the same millisecond.
fn session_id(interaction: &Interaction) -> String {
    format!(
        "{}-{}-{}",
        interaction.id,
        interaction.start_time.round() as i64,
        Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::RenderPhase;

    fn render(commit_time: f64) -> RenderEntry {
        RenderEntry {
            component: "UserList".to_string(),
            actual_duration: 4.0,
            base_duration: 6.0,
            start_time: commit_time - 4.0,
            commit_time,
            phase: RenderPhase::Update,
        }
    }

    #[test]
    fn test_new_session_copies_start_time() {
        let session = PerformanceSession::new(Interaction::new("load-users", "click", 42.4));

        assert_eq!(session.start_time, 42.4);
        assert!(session.id.starts_with("load-users-42-"));
        assert!(session.end_time.is_none());
        assert_eq!(session.event_count(), 0);
    }

    #[test]
    fn test_identical_interactions_get_distinct_ids() {
        let interaction = Interaction::new("save", "click", 10.0);
        let a = PerformanceSession::new(interaction.clone());
        let b = PerformanceSession::new(interaction);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_with_render_leaves_original_untouched() {
        let original = PerformanceSession::new(Interaction::new("save", "click", 0.0));
        let updated = original.with_render(render(20.0));

        assert!(original.renders.is_empty());
        assert_eq!(updated.renders.len(), 1);
        assert_eq!(updated.end_time, Some(20.0));
        assert_eq!(updated.id, original.id);
    }

    #[test]
    fn test_end_time_tracks_last_landed_event() {
        let session = PerformanceSession::new(Interaction::new("save", "click", 0.0))
            .with_network(NetworkEntry {
                url: "/api".to_string(),
                method: "POST".to_string(),
                status: 201,
                duration: 80.0,
                start_time: 30.0,
                end_time: 110.0,
            })
            .with_render(render(60.0));

        // Last landed wins, even if it finished earlier.
        assert_eq!(session.end_time, Some(60.0));
        assert_eq!(session.duration_ms(500.0), 60.0);
    }

    #[test]
    fn test_duration_falls_back_to_now() {
        let session = PerformanceSession::new(Interaction::new("save", "click", 100.0));
        assert_eq!(session.duration_ms(250.0), 150.0);
    }
}

//! Read-only views over store snapshots for presentation.
//!
//! Nothing here mutates the store. These are the figures an overlay shows for
//! the session it is focused on: a stats summary and a time-sorted timeline.

use crate::core::session::PerformanceSession;
use crate::core::store::StoreState;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Label shown before any interaction has been observed.
pub const NO_INTERACTION_LABEL: &str = "No interactions yet";

/// The session a display should focus on: the active one, or else the most
/// recent.
pub fn display_session(state: &StoreState) -> Option<&Arc<PerformanceSession>> {
    match state.active_session_id.as_deref() {
        Some(id) => state.session(id),
        None => state.sessions.last(),
    }
}

/// The slowest render in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowestComponent {
    pub name: String,
    pub duration: f64,
}

/// Headline figures for one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub interaction_label: String,
    /// Interaction to last activity; `None` when there is no session
    pub total_duration_ms: Option<f64>,
    /// Sum of all network durations
    pub api_duration_ms: f64,
    pub render_count: usize,
    pub slowest_component: Option<SlowestComponent>,
    pub long_task_count: usize,
    pub fps: Option<u32>,
}

impl SessionSummary {
    /// Summarise `session`. A session with no landed events measures its
    /// duration up to `now_ms`.
    pub fn compute(session: Option<&PerformanceSession>, fps: Option<u32>, now_ms: f64) -> Self {
        let Some(session) = session else {
            return Self {
                interaction_label: NO_INTERACTION_LABEL.to_string(),
                total_duration_ms: None,
                api_duration_ms: 0.0,
                render_count: 0,
                slowest_component: None,
                long_task_count: 0,
                fps,
            };
        };

        let slowest_component = session
            .renders
            .iter()
            .fold(None::<SlowestComponent>, |slowest, render| match slowest {
                Some(current) if render.actual_duration <= current.duration => Some(current),
                _ => Some(SlowestComponent {
                    name: render.component.clone(),
                    duration: render.actual_duration,
                }),
            });

        Self {
            interaction_label: session.interaction.id.clone(),
            total_duration_ms: Some(session.duration_ms(now_ms)),
            api_duration_ms: session.network.iter().map(|entry| entry.duration).sum(),
            render_count: session.renders.len(),
            slowest_component,
            long_task_count: session.long_tasks.len(),
            fps,
        }
    }

    /// Summarise the session a display would focus on in `state`.
    pub fn for_state(state: &StoreState, now_ms: f64) -> Self {
        Self::compute(
            display_session(state).map(Arc::as_ref),
            state.fps.map(|sample| sample.current),
            now_ms,
        )
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Last interaction: {}", self.interaction_label)?;
        writeln!(f, "  Total time:        {}", format_duration(self.total_duration_ms))?;
        writeln!(f, "  API:               {}", format_duration(Some(self.api_duration_ms)))?;
        writeln!(f, "  Renders:           {}", self.render_count)?;
        match &self.slowest_component {
            Some(slowest) => writeln!(
                f,
                "  Slowest component: {} ({})",
                slowest.name,
                format_duration(Some(slowest.duration))
            )?,
            None => writeln!(f, "  Slowest component: -")?,
        }
        writeln!(f, "  Long tasks:        {}", self.long_task_count)?;
        match self.fps {
            Some(fps) => write!(f, "  FPS:               {fps} fps"),
            None => write!(f, "  FPS:               -"),
        }
    }
}

/// Kind of row in a session timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineItemKind {
    Interaction,
    Render,
    Network,
    LongTask,
}

/// One row of a session timeline, positioned relative to the interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub id: String,
    pub kind: TimelineItemKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub offset_ms: f64,
    pub duration_ms: f64,
}

/// Every interaction, render, network and long-task item of `session`,
/// sorted by offset from the session start. Ties keep the order above.
pub fn timeline(session: &PerformanceSession) -> Vec<TimelineItem> {
    let base = session.start_time;
    let mut items = vec![TimelineItem {
        id: session.id.clone(),
        kind: TimelineItemKind::Interaction,
        label: session.interaction.id.clone(),
        detail: Some(session.interaction.kind.clone()),
        offset_ms: 0.0,
        duration_ms: 0.0,
    }];

    items.extend(session.renders.iter().enumerate().map(|(index, render)| TimelineItem {
        id: format!("{}-render-{index}", session.id),
        kind: TimelineItemKind::Render,
        label: render.component.clone(),
        detail: Some(format!("phase: {}", render.phase.as_str())),
        offset_ms: render.start_time - base,
        duration_ms: render.actual_duration,
    }));

    items.extend(session.network.iter().enumerate().map(|(index, entry)| TimelineItem {
        id: format!("{}-network-{index}", session.id),
        kind: TimelineItemKind::Network,
        label: entry.url.clone(),
        detail: Some(format!("{} • status {}", entry.method, entry.status)),
        offset_ms: entry.start_time - base,
        duration_ms: entry.duration,
    }));

    items.extend(session.long_tasks.iter().enumerate().map(|(index, task)| TimelineItem {
        id: format!("{}-longtask-{index}", session.id),
        kind: TimelineItemKind::LongTask,
        label: if task.name.is_empty() {
            "Long Task".to_string()
        } else {
            task.name.clone()
        },
        detail: Some(format!("{:.1}ms", task.duration)),
        offset_ms: task.start_time - base,
        duration_ms: task.duration,
    }));

    items.sort_by(|a, b| a.offset_ms.total_cmp(&b.offset_ms));
    items
}

fn format_duration(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{}ms", ms.round() as i64),
        None => "-".to_string(),
    }
}

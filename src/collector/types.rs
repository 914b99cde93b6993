//! Normalized performance event types.
//!
//! These records are the stable wire contract between producers and the
//! session-windowing core. Field names serialize as camelCase so a stream
//! emitted by an in-page agent can be consumed without translation.
//!
//! All timestamps are monotonic milliseconds since an arbitrary origin
//! (typically navigation start).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user interaction that anchors a new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    /// Resolved, human-meaningful identifier of the interacted element
    pub id: String,
    /// Originating event type (e.g. "click", "input")
    #[serde(rename = "type")]
    pub kind: String,
    /// When the interaction was observed
    pub start_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
}

impl Interaction {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, start_time: f64) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            start_time,
            end_time: None,
        }
    }
}

/// Render phase reported by the UI framework profiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderPhase {
    Mount,
    Update,
}

impl RenderPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderPhase::Mount => "mount",
            RenderPhase::Update => "update",
        }
    }
}

/// The cost of one component commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderEntry {
    pub component: String,
    /// Time spent rendering this commit
    pub actual_duration: f64,
    /// Estimated time to render the whole subtree without memoization
    pub base_duration: f64,
    pub start_time: f64,
    pub commit_time: f64,
    pub phase: RenderPhase,
}

/// A completed (or failed) network round-trip.
///
/// A status of [`NetworkEntry::FAILED_STATUS`] means the request never
/// produced a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEntry {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub duration: f64,
    pub start_time: f64,
    pub end_time: f64,
}

impl NetworkEntry {
    /// Sentinel status for requests that were rejected before a response.
    pub const FAILED_STATUS: u16 = 0;

    pub fn is_failure(&self) -> bool {
        self.status == Self::FAILED_STATUS
    }
}

/// Container attribution for a long task, as reported by the platform.
///
/// Unknown keys are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTaskAttribution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_src: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A main-thread stall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTaskEntry {
    pub name: String,
    pub duration: f64,
    pub start_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Vec<LongTaskAttribution>>,
}

impl LongTaskEntry {
    /// End of the stall (`start_time + duration`).
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// A frame-rate sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsData {
    /// Frames per second over the last sample interval
    pub current: u32,
    /// Lowest sample seen since the sampler started
    pub min: u32,
    pub timestamp: f64,
}

/// Unified event envelope, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PerfEvent {
    Interaction(Interaction),
    Render(RenderEntry),
    Network(NetworkEntry),
    LongTask(LongTaskEntry),
    Fps(FpsData),
}

impl PerfEvent {
    /// When the observed activity began.
    pub fn start_time(&self) -> f64 {
        match self {
            PerfEvent::Interaction(e) => e.start_time,
            PerfEvent::Render(e) => e.start_time,
            PerfEvent::Network(e) => e.start_time,
            PerfEvent::LongTask(e) => e.start_time,
            PerfEvent::Fps(e) => e.timestamp,
        }
    }

    /// Timestamp of the last activity this event represents.
    ///
    /// This is the value a session's `end_time` is moved to when the event
    /// lands in it, and the earliest moment a producer could have delivered it.
    pub fn activity_end(&self) -> f64 {
        match self {
            PerfEvent::Interaction(e) => e.start_time,
            PerfEvent::Render(e) => e.commit_time,
            PerfEvent::Network(e) => e.end_time,
            PerfEvent::LongTask(e) => e.end_time(),
            PerfEvent::Fps(e) => e.timestamp,
        }
    }

    /// Short name of the event kind, matching the wire tag.
    pub fn kind(&self) -> &'static str {
        match self {
            PerfEvent::Interaction(_) => "interaction",
            PerfEvent::Render(_) => "render",
            PerfEvent::Network(_) => "network",
            PerfEvent::LongTask(_) => "longTask",
            PerfEvent::Fps(_) => "fps",
        }
    }
}

impl From<Interaction> for PerfEvent {
    fn from(value: Interaction) -> Self {
        PerfEvent::Interaction(value)
    }
}

impl From<RenderEntry> for PerfEvent {
    fn from(value: RenderEntry) -> Self {
        PerfEvent::Render(value)
    }
}

impl From<NetworkEntry> for PerfEvent {
    fn from(value: NetworkEntry) -> Self {
        PerfEvent::Network(value)
    }
}

impl From<LongTaskEntry> for PerfEvent {
    fn from(value: LongTaskEntry) -> Self {
        PerfEvent::LongTask(value)
    }
}

impl From<FpsData> for PerfEvent {
    fn from(value: FpsData) -> Self {
        PerfEvent::Fps(value)
    }
}

//! Event producers for the performance monitor.
//!
//! Each producer observes one signal class and hands normalized events to a
//! listener. Producers share no state with each other; each one can be
//! stopped independently through its [`TrackerHandle`].

pub mod fps;
pub mod handle;
pub mod interaction;
pub mod longtask;
pub mod network;
pub mod render;
pub mod types;

// Re-export commonly used types
pub use fps::{FpsSampler, FpsSamplerOptions};
pub use handle::{listener, Listener, TrackerHandle};
pub use interaction::{
    resolve_interaction_id, ElementInfo, InteractionTracker, InteractionTrackerOptions,
};
pub use longtask::{LongTaskObserver, PerformanceEntry};
pub use network::{
    normalize_method, Fetch, FetchError, FetchRequest, FetchResponse, FetchSlot, InFlightRequest,
    NetworkTracker, NetworkTrackerOptions, RequestTimer,
};
pub use render::RenderProfiler;
pub use types::{
    FpsData, Interaction, LongTaskAttribution, LongTaskEntry, NetworkEntry, PerfEvent,
    RenderEntry, RenderPhase,
};

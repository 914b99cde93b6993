//! Core functionality for the performance monitor.
//!
//! This module contains:
//! - Session values and the observable store that holds them
//! - The windowing state machine that groups events into sessions
//! - Clocks for real and virtual time
//! - Read-only summaries for presentation

pub mod clock;
pub mod session;
pub mod store;
pub mod summary;
pub mod windowing;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, MonotonicClock, SharedClock};
pub use session::PerformanceSession;
pub use store::{PerformanceStore, Snapshot, StoreListener, StoreState, Subscription};
pub use summary::{display_session, timeline, SessionSummary, TimelineItem, TimelineItemKind};
pub use windowing::{
    RelayMessage, SessionManager, SessionManagerOptions, SessionRelay, WindowState,
    DEFAULT_SESSION_TIMEOUT,
};

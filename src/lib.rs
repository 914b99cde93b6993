//! perf-hud - interaction-scoped performance monitoring.
//!
//! This library groups a stream of UI performance signals (renders, network
//! requests, long tasks, frame-rate samples) into sessions, each anchored on
//! the user interaction that caused them, and keeps them in an observable
//! store for overlays and inspectors to read.
//!
//! # Session rules
//!
//! - **One interaction per session**: a new interaction closes the open
//!   session before opening its own
//! - **Idle close**: a session closes after the configured timeout passes
//!   with no activity
//! - **No reopening**: events that arrive while idle update the "latest"
//!   slots only
//! - **Snapshot reads**: readers get immutable snapshots, never live state
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          perf-hud                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Collector  │──▶│  Windowing  │──▶│    Store    │──▶ UI │
//! │  │ (producers) │   │ (sessions)  │   │ (snapshots) │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                           │                 │               │
//! │                           ▼                 ▼               │
//! │                    ┌─────────────┐   ┌─────────────┐       │
//! │                    │  Activity   │   │   Summary   │       │
//! │                    │    Log      │   │  Timeline   │       │
//! │                    └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use perf_hud::core::{ManualClock, PerformanceStore, SessionManager, SessionManagerOptions};
//! use perf_hud::collector::{Interaction, NetworkEntry};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new(0.0);
//! let options = SessionManagerOptions::default()
//!     .with_timeout(Duration::from_millis(200))
//!     .with_clock(Arc::new(clock.clone()));
//! let mut manager = SessionManager::new(PerformanceStore::new(), options);
//!
//! manager.handle_interaction(Interaction::new("load-users", "click", 0.0));
//! manager.handle_network(NetworkEntry {
//!     url: "/api/users".into(),
//!     method: "GET".into(),
//!     status: 200,
//!     duration: 120.0,
//!     start_time: 10.0,
//!     end_time: 130.0,
//! });
//!
//! clock.advance(250.0);
//! manager.check_expiry();
//!
//! let state = manager.store().get_state();
//! assert!(state.active_session_id.is_none());
//! assert_eq!(state.sessions[0].network.len(), 1);
//! ```

pub mod activity;
pub mod collector;
pub mod config;
pub mod core;
pub mod runtime;
pub mod stream;

// Re-export key types at crate root for convenience
pub use activity::{ActivityLog, ActivityStats, SharedActivityLog};
pub use collector::{
    FpsData, Interaction, LongTaskEntry, NetworkEntry, PerfEvent, RenderEntry, RenderPhase,
};
pub use config::{Config, ConfigError};
pub use core::{
    PerformanceSession, PerformanceStore, SessionManager, SessionManagerOptions, SessionSummary,
    StoreState, Subscription,
};
pub use runtime::{EventSink, Monitor, RunOutcome, Trackers};
pub use stream::{EventReader, EventStreamError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Activity accounting for the performance monitor.
//!
//! Counts what producers delivered and how sessions opened and closed, so a
//! host can show how much of the event stream was actually correlated.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, ActivityLog, ActivityStats, SharedActivityLog};

//! Running counters of what the monitor has observed.
//!
//! The log only counts. It never stores event payloads, so it is cheap to
//! keep attached for the lifetime of a monitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Event and session counters for one monitor.
#[derive(Debug)]
pub struct ActivityLog {
    interactions: AtomicU64,
    renders: AtomicU64,
    network_requests: AtomicU64,
    long_tasks: AtomicU64,
    fps_samples: AtomicU64,
    /// Events that arrived while no session was active
    uncorrelated_events: AtomicU64,
    sessions_opened: AtomicU64,
    /// Sessions force-closed by a newer interaction
    sessions_superseded: AtomicU64,
    /// Sessions closed by the idle timeout
    sessions_expired: AtomicU64,
    started_at: DateTime<Utc>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            interactions: AtomicU64::new(0),
            renders: AtomicU64::new(0),
            network_requests: AtomicU64::new(0),
            long_tasks: AtomicU64::new(0),
            fps_samples: AtomicU64::new(0),
            uncorrelated_events: AtomicU64::new(0),
            sessions_opened: AtomicU64::new(0),
            sessions_superseded: AtomicU64::new(0),
            sessions_expired: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_interaction(&self) {
        self.interactions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_render(&self) {
        self.renders.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_request(&self) {
        self.network_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_long_task(&self) {
        self.long_tasks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fps_sample(&self) {
        self.fps_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_uncorrelated_event(&self) {
        self.uncorrelated_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_superseded(&self) {
        self.sessions_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_expired(&self) {
        self.sessions_expired.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> ActivityStats {
        ActivityStats {
            interactions: self.interactions.load(Ordering::Relaxed),
            renders: self.renders.load(Ordering::Relaxed),
            network_requests: self.network_requests.load(Ordering::Relaxed),
            long_tasks: self.long_tasks.load(Ordering::Relaxed),
            fps_samples: self.fps_samples.load(Ordering::Relaxed),
            uncorrelated_events: self.uncorrelated_events.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_superseded: self.sessions_superseded.load(Ordering::Relaxed),
            sessions_expired: self.sessions_expired.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Monitor Activity:\n\
             - Interactions: {}\n\
             - Renders: {}\n\
             - Network requests: {}\n\
             - Long tasks: {}\n\
             - FPS samples: {}\n\
             - Uncorrelated events: {}\n\
             \n\
             Sessions:\n\
             - Opened: {}\n\
             - Superseded by a new interaction: {}\n\
             - Closed after idle timeout: {}\n\
             - Uptime: {} seconds",
            stats.interactions,
            stats.renders,
            stats.network_requests,
            stats.long_tasks,
            stats.fps_samples,
            stats.uncorrelated_events,
            stats.sessions_opened,
            stats.sessions_superseded,
            stats.sessions_expired,
            stats.uptime_secs
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.interactions,
            &self.renders,
            &self.network_requests,
            &self.long_tasks,
            &self.fps_samples,
            &self.uncorrelated_events,
            &self.sessions_opened,
            &self.sessions_superseded,
            &self.sessions_expired,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of activity counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityStats {
    pub interactions: u64,
    pub renders: u64,
    pub network_requests: u64,
    pub long_tasks: u64,
    pub fps_samples: u64,
    pub uncorrelated_events: u64,
    pub sessions_opened: u64,
    pub sessions_superseded: u64,
    pub sessions_expired: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared activity log.
pub type SharedActivityLog = Arc<ActivityLog>;

/// Create a new shared activity log.
pub fn create_shared_log() -> SharedActivityLog {
    Arc::new(ActivityLog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_log_counting() {
        let log = ActivityLog::new();

        log.record_interaction();
        log.record_render();
        log.record_render();
        log.record_session_opened();

        let stats = log.stats();
        assert_eq!(stats.interactions, 1);
        assert_eq!(stats.renders, 2);
        assert_eq!(stats.sessions_opened, 1);
        assert_eq!(stats.network_requests, 0);
    }

    #[test]
    fn test_activity_log_reset() {
        let log = ActivityLog::new();

        log.record_network_request();
        log.record_uncorrelated_event();
        log.record_session_expired();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.network_requests, 0);
        assert_eq!(stats.uncorrelated_events, 0);
        assert_eq!(stats.sessions_expired, 0);
    }

    #[test]
    fn test_summary_format() {
        let log = ActivityLog::new();
        let summary = log.summary();

        assert!(summary.contains("Interactions"));
        assert!(summary.contains("Uncorrelated events"));
        assert!(summary.contains("Closed after idle timeout"));
    }
}

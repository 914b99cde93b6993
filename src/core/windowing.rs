//! Session windowing: grouping the event stream into interaction sessions.
//!
//! The [`SessionManager`] is a two-state machine:
//!
//! ```text
//!            interaction                 render / network / long task / fps
//!   ┌──────┐ ──────────▶ ┌──────┐ ◀───────────────────────────────┐
//!   │ Idle │             │ Open │ ────────────────────────────────┘
//!   └──────┘ ◀────────── └──────┘ ─┐  interaction: close, open new
//!            idle timeout     ▲     │
//!                             └─────┘
//! ```
//!
//! A new interaction always closes the open session first, so two
//! interactions never share a session. Every event that lands in the open
//! session pushes the close deadline out by the idle timeout. Events that
//! arrive while idle still update the store's "latest" slots but are not
//! correlated, and they never reopen a closed session.
//!
//! The close timer is an owned deadline rather than a scheduled callback.
//! The host calls [`SessionManager::check_expiry`] whenever it wakes (the
//! runtime loop does so on every receive timeout), and tests do the same after
//! advancing a [`ManualClock`](crate::core::clock::ManualClock).

use crate::activity::SharedActivityLog;
use crate::collector::types::{
    FpsData, Interaction, LongTaskEntry, NetworkEntry, PerfEvent, RenderEntry,
};
use crate::core::clock::{MonotonicClock, SharedClock};
use crate::core::session::PerformanceSession;
use crate::core::store::PerformanceStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Default idle timeout before an open session closes.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_millis(2000);

/// Session notifications forwarded to an out-of-process inspector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RelayMessage {
    /// A session was just opened
    Session(Arc<PerformanceSession>),
    /// The active session received an event
    SessionUpdate(Arc<PerformanceSession>),
}

/// Callback receiving [`RelayMessage`]s.
pub type SessionRelay = Arc<dyn Fn(&RelayMessage) + Send + Sync>;

/// Options for constructing a [`SessionManager`].
#[derive(Clone)]
pub struct SessionManagerOptions {
    /// Maximum gap between activity and the close of a session
    pub session_timeout: Duration,
    pub clock: SharedClock,
    /// Explicit opt-in for relaying sessions to an inspector
    pub relay: Option<SessionRelay>,
    pub activity_log: Option<SharedActivityLog>,
}

impl SessionManagerOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_relay(mut self, relay: SessionRelay) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn with_activity_log(mut self, log: SharedActivityLog) -> Self {
        self.activity_log = Some(log);
        self
    }
}

impl Default for SessionManagerOptions {
    fn default() -> Self {
        Self {
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            clock: Arc::new(MonotonicClock::new()),
            relay: None,
            activity_log: None,
        }
    }
}

impl std::fmt::Debug for SessionManagerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManagerOptions")
            .field("session_timeout", &self.session_timeout)
            .field("relay", &self.relay.is_some())
            .field("activity_log", &self.activity_log.is_some())
            .finish_non_exhaustive()
    }
}

/// Observable state of the windowing machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Idle,
    Open,
}

/// The single pending close of the active session.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CloseTimer {
    deadline_ms: f64,
}

/// Turns a stream of performance events into interaction sessions.
pub struct SessionManager {
    store: PerformanceStore,
    clock: SharedClock,
    timeout_ms: f64,
    relay: Option<SessionRelay>,
    activity_log: Option<SharedActivityLog>,
    /// The session currently receiving events
    active: Option<Arc<PerformanceSession>>,
    close_timer: Option<CloseTimer>,
}

impl SessionManager {
    pub fn new(store: PerformanceStore, options: SessionManagerOptions) -> Self {
        Self {
            store,
            clock: options.clock,
            timeout_ms: options.session_timeout.as_secs_f64() * 1000.0,
            relay: options.relay,
            activity_log: options.activity_log,
            active: None,
            close_timer: None,
        }
    }

    pub fn store(&self) -> &PerformanceStore {
        &self.store
    }

    pub fn state(&self) -> WindowState {
        if self.active.is_some() {
            WindowState::Open
        } else {
            WindowState::Idle
        }
    }

    pub fn active_session(&self) -> Option<&Arc<PerformanceSession>> {
        self.active.as_ref()
    }

    /// When the active session will close if nothing else arrives.
    pub fn next_deadline(&self) -> Option<f64> {
        self.close_timer.map(|timer| timer.deadline_ms)
    }

    /// Time left before the pending close, zero if it is already due.
    pub fn time_until_close(&self) -> Option<Duration> {
        let deadline = self.next_deadline()?;
        let remaining = (deadline - self.clock.now_ms()).max(0.0);
        Some(Duration::from_micros((remaining * 1000.0).round() as u64))
    }

    /// Route any event to its handler.
    pub fn handle_event(&mut self, event: PerfEvent) {
        match event {
            PerfEvent::Interaction(e) => self.handle_interaction(e),
            PerfEvent::Render(e) => self.handle_render(e),
            PerfEvent::Network(e) => self.handle_network(e),
            PerfEvent::LongTask(e) => self.handle_long_task(e),
            PerfEvent::Fps(e) => self.handle_fps(e),
        }
    }

    /// Close any open session and open a new one anchored on `interaction`.
    pub fn handle_interaction(&mut self, interaction: Interaction) {
        if let Some(log) = &self.activity_log {
            log.record_interaction();
        }

        if let Some(previous) = self.active.take() {
            self.close_timer = None;
            self.store.set_active_session(None);
            if let Some(log) = &self.activity_log {
                log.record_session_superseded();
            }
            tracing::info!(
                session_id = %previous.id,
                events = previous.event_count(),
                "session superseded by new interaction"
            );
        }

        self.store.set_last_interaction(interaction.clone());
        self.start_session(interaction);
    }

    pub fn handle_render(&mut self, render: RenderEntry) {
        tracing::debug!(component = %render.component, "handling render");
        if let Some(log) = &self.activity_log {
            log.record_render();
        }
        self.store.set_latest_render(render.clone());
        self.update_active(|session| session.with_render(render));
    }

    pub fn handle_network(&mut self, entry: NetworkEntry) {
        tracing::debug!(url = %entry.url, status = entry.status, "handling network entry");
        if let Some(log) = &self.activity_log {
            log.record_network_request();
        }
        self.store.set_latest_network(entry.clone());
        self.update_active(|session| session.with_network(entry));
    }

    pub fn handle_long_task(&mut self, task: LongTaskEntry) {
        tracing::debug!(duration = task.duration, "handling long task");
        if let Some(log) = &self.activity_log {
            log.record_long_task();
        }
        self.store.set_latest_long_task(task.clone());
        self.update_active(|session| session.with_long_task(task));
    }

    pub fn handle_fps(&mut self, sample: FpsData) {
        if let Some(log) = &self.activity_log {
            log.record_fps_sample();
        }
        self.store.set_fps(sample);
        self.update_active(|session| session.with_fps_sample(sample));
    }

    /// Fire the close timer if it is due. Returns true if a session closed.
    pub fn check_expiry(&mut self) -> bool {
        let Some(timer) = self.close_timer else {
            return false;
        };
        if self.clock.now_ms() < timer.deadline_ms {
            return false;
        }

        self.close_timer = None;
        let Some(session) = self.active.take() else {
            return false;
        };

        self.store.set_active_session(None);
        if let Some(log) = &self.activity_log {
            log.record_session_expired();
        }
        tracing::info!(
            session_id = %session.id,
            events = session.event_count(),
            "session closed after idle timeout"
        );
        true
    }

    /// Return to idle, cancel the pending close, and clear the store.
    pub fn reset(&mut self) {
        self.active = None;
        self.close_timer = None;
        self.store.reset();
    }

    /// Cancel the pending close and forget the active session, leaving the
    /// store's history as it is.
    pub fn dispose(&mut self) {
        self.active = None;
        self.close_timer = None;
    }

    fn start_session(&mut self, interaction: Interaction) {
        let session = Arc::new(PerformanceSession::new(interaction));
        tracing::info!(
            session_id = %session.id,
            interaction = %session.interaction.id,
            kind = %session.interaction.kind,
            "session opened"
        );

        self.active = Some(Arc::clone(&session));
        self.store.add_session(Arc::clone(&session));
        if let Some(log) = &self.activity_log {
            log.record_session_opened();
        }
        self.emit(RelayMessage::Session(session));
        self.arm_close_timer();
    }

    fn update_active<F>(&mut self, apply: F)
    where
        F: FnOnce(&PerformanceSession) -> PerformanceSession,
    {
        let updated = match &self.active {
            Some(current) => Arc::new(apply(current)),
            None => {
                if let Some(log) = &self.activity_log {
                    log.record_uncorrelated_event();
                }
                return;
            }
        };

        self.active = Some(Arc::clone(&updated));
        self.store.update_session(&updated.id, |_| Arc::clone(&updated));
        self.emit(RelayMessage::SessionUpdate(updated));
        self.arm_close_timer();
    }

    /// Replace any pending close with one `timeout` from now.
    fn arm_close_timer(&mut self) {
        self.close_timer = Some(CloseTimer {
            deadline_ms: self.clock.now_ms() + self.timeout_ms,
        });
    }

    fn emit(&self, message: RelayMessage) {
        if let Some(relay) = &self.relay {
            relay(&message);
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("timeout_ms", &self.timeout_ms)
            .field("active", &self.active.as_ref().map(|s| s.id.as_str()))
            .field("close_timer", &self.close_timer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::create_shared_log;
    use crate::collector::types::RenderPhase;
    use crate::core::clock::{Clock, ManualClock};
    use std::sync::Mutex;

    fn manager(timeout_ms: u64) -> (SessionManager, ManualClock) {
        let clock = ManualClock::new(0.0);
        let options = SessionManagerOptions::default()
            .with_timeout(Duration::from_millis(timeout_ms))
            .with_clock(Arc::new(clock.clone()));
        (SessionManager::new(PerformanceStore::new(), options), clock)
    }

    fn render(component: &str, commit_time: f64) -> RenderEntry {
        RenderEntry {
            component: component.to_string(),
            actual_duration: 5.0,
            base_duration: 8.0,
            start_time: commit_time - 5.0,
            commit_time,
            phase: RenderPhase::Update,
        }
    }

    fn fps(timestamp: f64) -> FpsData {
        FpsData {
            current: 60,
            min: 55,
            timestamp,
        }
    }

    #[test]
    fn test_interaction_opens_session() {
        let (mut manager, _clock) = manager(200);
        manager.handle_interaction(Interaction::new("save", "click", 0.0));

        let state = manager.store().get_state();
        assert_eq!(manager.state(), WindowState::Open);
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(state.active_session_id.as_ref(), Some(&state.sessions[0].id));
        assert_eq!(state.last_interaction.as_ref().map(|i| i.id.as_str()), Some("save"));
        assert_eq!(manager.next_deadline(), Some(200.0));
    }

    #[test]
    fn test_second_interaction_supersedes_first() {
        let (mut manager, clock) = manager(200);
        let log = create_shared_log();
        manager.activity_log = Some(Arc::clone(&log));

        manager.handle_interaction(Interaction::new("first", "click", 0.0));
        clock.advance(10.0);
        manager.handle_interaction(Interaction::new("second", "click", 10.0));

        let state = manager.store().get_state();
        assert_eq!(state.sessions.len(), 2);
        assert_ne!(state.sessions[0].id, state.sessions[1].id);
        assert_eq!(state.active_session_id.as_ref(), Some(&state.sessions[1].id));
        assert_eq!(manager.next_deadline(), Some(210.0));
        assert_eq!(log.stats().sessions_superseded, 1);
    }

    #[test]
    fn test_events_while_idle_only_update_latest() {
        let (mut manager, _clock) = manager(200);
        manager.handle_render(render("App", 5.0));
        manager.handle_fps(fps(6.0));

        let state = manager.store().get_state();
        assert!(state.sessions.is_empty());
        assert_eq!(state.latest_render.as_ref().map(|r| r.component.as_str()), Some("App"));
        assert_eq!(state.fps.map(|f| f.current), Some(60));
        assert_eq!(manager.next_deadline(), None);
    }

    #[test]
    fn test_activity_rearms_close_timer() {
        let (mut manager, clock) = manager(200);
        manager.handle_interaction(Interaction::new("save", "click", 0.0));

        clock.advance(150.0);
        manager.handle_render(render("Form", 150.0));
        assert_eq!(manager.next_deadline(), Some(350.0));

        clock.advance_to(349.0);
        assert!(!manager.check_expiry());
        assert_eq!(manager.state(), WindowState::Open);

        clock.advance_to(350.0);
        assert!(manager.check_expiry());
        assert_eq!(manager.state(), WindowState::Idle);
        assert!(manager.store().get_state().active_session_id.is_none());
    }

    #[test]
    fn test_expiry_keeps_history_intact() {
        let (mut manager, clock) = manager(200);
        manager.handle_interaction(Interaction::new("save", "click", 0.0));
        manager.handle_render(render("Form", 12.0));

        clock.advance(250.0);
        assert!(manager.check_expiry());
        assert!(!manager.check_expiry());

        let state = manager.store().get_state();
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(state.sessions[0].renders.len(), 1);
        assert_eq!(state.sessions[0].end_time, Some(12.0));
    }

    #[test]
    fn test_late_event_does_not_reopen_session() {
        let (mut manager, clock) = manager(200);
        manager.handle_interaction(Interaction::new("save", "click", 0.0));
        clock.advance(300.0);
        manager.check_expiry();

        manager.handle_long_task(LongTaskEntry {
            name: "self".to_string(),
            duration: 90.0,
            start_time: 310.0,
            attribution: None,
        });

        let state = manager.store().get_state();
        assert!(state.active_session_id.is_none());
        assert!(state.sessions[0].long_tasks.is_empty());
        assert!(state.latest_long_task.is_some());
        assert_eq!(manager.next_deadline(), None);
    }

    #[test]
    fn test_dispose_keeps_store_and_cancels_timer() {
        let (mut manager, clock) = manager(200);
        manager.handle_interaction(Interaction::new("save", "click", 0.0));
        manager.dispose();

        clock.advance(500.0);
        assert!(!manager.check_expiry());

        let state = manager.store().get_state();
        assert_eq!(state.sessions.len(), 1);
        // The store was not touched, so it still names the session.
        assert!(state.active_session_id.is_some());
        assert_eq!(manager.state(), WindowState::Idle);
    }

    #[test]
    fn test_reset_clears_store_and_timer() {
        let (mut manager, clock) = manager(200);
        manager.handle_interaction(Interaction::new("save", "click", 0.0));
        manager.reset();

        clock.advance(500.0);
        assert!(!manager.check_expiry());
        assert_eq!(
            *manager.store().get_state(),
            crate::core::store::StoreState::default()
        );
    }

    #[test]
    fn test_relay_receives_open_and_updates() {
        let (manager, clock) = manager(200);
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        let relay: SessionRelay = Arc::new(move |message: &RelayMessage| {
            sink.lock().unwrap().push(message.clone());
        });
        let mut manager = SessionManager::new(
            manager.store().clone(),
            SessionManagerOptions::default()
                .with_clock(Arc::new(clock))
                .with_relay(relay),
        );

        manager.handle_interaction(Interaction::new("save", "click", 0.0));
        manager.handle_fps(fps(16.0));

        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], RelayMessage::Session(_)));
        match &messages[1] {
            RelayMessage::SessionUpdate(session) => assert_eq!(session.fps_samples.len(), 1),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_relay_message_wire_format() {
        let session = Arc::new(PerformanceSession::new(Interaction::new("save", "click", 0.0)));
        let json = serde_json::to_value(RelayMessage::Session(session)).unwrap();
        assert_eq!(json["type"], "session");
        assert_eq!(json["payload"]["interaction"]["id"], "save");
    }

    #[test]
    fn test_time_until_close() {
        let (mut manager, clock) = manager(200);
        assert_eq!(manager.time_until_close(), None);

        manager.handle_interaction(Interaction::new("save", "click", 0.0));
        clock.advance(50.0);
        assert_eq!(manager.time_until_close(), Some(Duration::from_millis(150)));

        clock.advance(500.0);
        assert_eq!(manager.time_until_close(), Some(Duration::ZERO));
        assert!(clock.now_ms() > 200.0);
    }
}

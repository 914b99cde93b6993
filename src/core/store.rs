//! Observable performance state store.
//!
//! The store holds a single immutable [`StoreState`] snapshot behind an
//! `Arc`. Every transition builds a new snapshot, swaps it in, and then calls
//! every subscriber synchronously on the caller's stack. Listeners run after
//! the internal lock is released, so they are free to call back into the store.

use crate::collector::types::{FpsData, Interaction, LongTaskEntry, NetworkEntry, RenderEntry};
use crate::core::session::PerformanceSession;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Aggregate state consumed by presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    /// Every session observed, oldest first
    pub sessions: Vec<Arc<PerformanceSession>>,
    pub active_session_id: Option<String>,
    pub last_interaction: Option<Interaction>,
    pub latest_render: Option<RenderEntry>,
    pub latest_network: Option<NetworkEntry>,
    pub latest_long_task: Option<LongTaskEntry>,
    pub fps: Option<FpsData>,
}

impl StoreState {
    /// The session currently receiving events, if any.
    pub fn active_session(&self) -> Option<&Arc<PerformanceSession>> {
        let id = self.active_session_id.as_deref()?;
        self.session(id)
    }

    pub fn session(&self, id: &str) -> Option<&Arc<PerformanceSession>> {
        self.sessions.iter().find(|session| session.id == id)
    }
}

/// Immutable point-in-time read of the store.
pub type Snapshot = Arc<StoreState>;

/// Callback invoked with each new snapshot.
pub type StoreListener = Arc<dyn Fn(&Snapshot) + Send + Sync>;

struct StoreInner {
    state: Mutex<Snapshot>,
    listeners: Mutex<Vec<(u64, StoreListener)>>,
    next_listener_id: AtomicU64,
}

/// Handle to a performance store. Clones share the same state.
#[derive(Clone)]
pub struct PerformanceStore {
    inner: Arc<StoreInner>,
}

impl PerformanceStore {
    /// Create a store with the empty initial snapshot.
    pub fn new() -> Self {
        Self::with_initial(StoreState::default())
    }

    /// Create a store seeded with `initial`.
    pub fn with_initial(initial: StoreState) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(Arc::new(initial)),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
            }),
        }
    }

    /// Current snapshot. Never blocks on listeners.
    pub fn get_state(&self) -> Snapshot {
        Arc::clone(&lock(&self.inner.state))
    }

    /// Register `listener`, call it once with the current snapshot, and again
    /// after every later transition until unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let listener: StoreListener = Arc::new(listener);
        lock(&self.inner.listeners).push((id, Arc::clone(&listener)));

        let current = self.get_state();
        listener(&current);

        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    /// Append `session` and make it the active session.
    ///
    /// The caller is responsible for having closed any previously active
    /// session.
    pub fn add_session(&self, session: impl Into<Arc<PerformanceSession>>) {
        let session = session.into();
        self.transition(|state| {
            state.active_session_id = Some(session.id.clone());
            state.sessions.push(session);
        });
    }

    /// Replace the session with `id` by `updater(session)`.
    ///
    /// Unknown ids are ignored: no new snapshot, no notification. The updater
    /// runs without the store lock held, so it may read the store. If the
    /// session was replaced or removed while the updater ran, that change wins
    /// and this update is dropped.
    pub fn update_session<F, S>(&self, id: &str, updater: F)
    where
        F: FnOnce(&PerformanceSession) -> S,
        S: Into<Arc<PerformanceSession>>,
    {
        let Some(current) = self.get_state().session(id).cloned() else {
            tracing::debug!(session_id = id, "update for unknown session ignored");
            return;
        };
        let updated: Arc<PerformanceSession> = updater(&current).into();

        let next = {
            let mut guard = lock(&self.inner.state);
            let Some(index) = guard
                .sessions
                .iter()
                .position(|s| Arc::ptr_eq(s, &current))
            else {
                tracing::debug!(session_id = id, "session changed during update; update dropped");
                return;
            };
            let mut state = StoreState::clone(&guard);
            state.sessions[index] = updated;
            let next = Arc::new(state);
            *guard = Arc::clone(&next);
            next
        };
        self.notify(&next);
    }

    pub fn set_active_session(&self, id: Option<String>) {
        self.transition(|state| state.active_session_id = id);
    }

    pub fn set_fps(&self, fps: FpsData) {
        self.transition(|state| state.fps = Some(fps));
    }

    pub fn set_last_interaction(&self, interaction: Interaction) {
        self.transition(|state| state.last_interaction = Some(interaction));
    }

    pub fn set_latest_render(&self, render: RenderEntry) {
        self.transition(|state| state.latest_render = Some(render));
    }

    pub fn set_latest_network(&self, entry: NetworkEntry) {
        self.transition(|state| state.latest_network = Some(entry));
    }

    pub fn set_latest_long_task(&self, task: LongTaskEntry) {
        self.transition(|state| state.latest_long_task = Some(task));
    }

    /// Restore the empty initial snapshot.
    pub fn reset(&self) {
        self.transition(|state| *state = StoreState::default());
    }

    /// Build the next snapshot from a copy of the current one, swap it in,
    /// then notify.
    fn transition<F>(&self, apply: F)
    where
        F: FnOnce(&mut StoreState),
    {
        let next = {
            let mut guard = lock(&self.inner.state);
            let mut state = StoreState::clone(&guard);
            apply(&mut state);
            let next = Arc::new(state);
            *guard = Arc::clone(&next);
            next
        };
        self.notify(&next);
    }

    fn notify(&self, snapshot: &Snapshot) {
        let listeners: Vec<StoreListener> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}

impl Default for PerformanceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PerformanceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceStore")
            .field("state", &self.get_state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Registration returned by [`PerformanceStore::subscribe`].
///
/// Dropping it does not unsubscribe; call [`Subscription::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    /// Remove the listener. Safe to call any number of times, and after the
    /// store itself is gone.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.store.upgrade() {
            lock(&inner.listeners).retain(|(id, _)| *id != self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Listeners never run under a lock, so a poisoned mutex only means a
/// transition closure panicked; the data itself is still a valid snapshot.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

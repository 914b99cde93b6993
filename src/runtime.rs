//! Host integration: producers → channel → session manager.
//!
//! Producers may live on any thread; they push events through an
//! [`EventSink`]. The [`Monitor`] owns the only receiver and the session
//! manager, and drives both from a single thread, so all windowing happens
//! in delivery order on one call stack.

use crate::activity::{create_shared_log, SharedActivityLog};
use crate::collector::fps::{FpsSampler, FpsSamplerOptions};
use crate::collector::handle::Listener;
use crate::collector::interaction::{InteractionTracker, InteractionTrackerOptions};
use crate::collector::longtask::LongTaskObserver;
use crate::collector::network::{NetworkTracker, NetworkTrackerOptions};
use crate::collector::render::RenderProfiler;
use crate::collector::types::PerfEvent;
use crate::config::Config;
use crate::core::clock::SharedClock;
use crate::core::store::PerformanceStore;
use crate::core::windowing::{SessionManager, SessionManagerOptions, SessionRelay};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sending half handed to producers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Sender<PerfEvent>,
}

impl EventSink {
    /// Queue an event. Returns false if the monitor is gone.
    pub fn send(&self, event: impl Into<PerfEvent>) -> bool {
        self.sender.send(event.into()).is_ok()
    }

    /// A producer listener that forwards into this sink.
    pub fn listener<T>(&self) -> Listener<T>
    where
        T: Into<PerfEvent> + 'static,
    {
        let sink = self.clone();
        Arc::new(move |event: T| {
            if !sink.send(event) {
                tracing::trace!("monitor stopped; event dropped");
            }
        })
    }
}

/// Producers enabled by the configuration, all feeding one sink.
pub struct Trackers {
    pub interaction: InteractionTracker,
    pub render: RenderProfiler,
    pub network: Option<NetworkTracker>,
    pub long_tasks: Option<LongTaskObserver>,
    pub fps: Option<FpsSampler>,
}

impl Trackers {
    /// Tear down every producer. Safe to call more than once.
    pub fn stop_all(&self) {
        self.interaction.handle().stop();
        self.render.handle().stop();
        if let Some(network) = &self.network {
            network.stop();
        }
        if let Some(long_tasks) = &self.long_tasks {
            long_tasks.handle().stop();
        }
        if let Some(fps) = &self.fps {
            fps.handle().stop();
        }
    }
}

/// Why [`Monitor::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The running flag was cleared
    Stopped,
    /// Every sink was dropped
    Disconnected,
}

/// Owns one store, one session manager and the event channel feeding them.
pub struct Monitor {
    config: Config,
    clock: SharedClock,
    manager: SessionManager,
    receiver: Receiver<PerfEvent>,
    activity_log: SharedActivityLog,
}

impl Monitor {
    /// Create a monitor and the sink its producers send to.
    ///
    /// `relay` is only installed when `config.relay_sessions` is set.
    pub fn new(
        config: Config,
        clock: SharedClock,
        relay: Option<SessionRelay>,
    ) -> (Self, EventSink) {
        let (sender, receiver) = unbounded();
        let activity_log = create_shared_log();

        let mut options = SessionManagerOptions::default()
            .with_timeout(config.session_timeout)
            .with_clock(Arc::clone(&clock))
            .with_activity_log(Arc::clone(&activity_log));
        if config.relay_sessions {
            if let Some(relay) = relay {
                options = options.with_relay(relay);
            }
        }

        let monitor = Self {
            manager: SessionManager::new(PerformanceStore::new(), options),
            config,
            clock,
            receiver,
            activity_log,
        };
        (monitor, EventSink { sender })
    }

    pub fn store(&self) -> &PerformanceStore {
        self.manager.store()
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn activity_log(&self) -> &SharedActivityLog {
        &self.activity_log
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the producers the configuration enables, wired to `sink`.
    pub fn trackers(&self, sink: &EventSink) -> Trackers {
        let config = &self.config;
        Trackers {
            interaction: InteractionTracker::new(
                sink.listener(),
                InteractionTrackerOptions {
                    events: config.interaction_events.clone(),
                },
                Arc::clone(&self.clock),
            ),
            render: RenderProfiler::new(sink.listener()),
            network: config.track_network.then(|| {
                NetworkTracker::new(
                    sink.listener(),
                    NetworkTrackerOptions::default(),
                    Arc::clone(&self.clock),
                )
            }),
            long_tasks: config
                .track_long_tasks
                .then(|| LongTaskObserver::new(sink.listener())),
            fps: config.track_fps.then(|| {
                FpsSampler::new(
                    sink.listener(),
                    FpsSamplerOptions {
                        sample_interval: config.fps_sample_interval,
                    },
                )
            }),
        }
    }

    /// Handle everything already queued without blocking. Returns the number
    /// of events handled.
    pub fn process_pending(&mut self) -> usize {
        self.manager.check_expiry();
        let mut handled = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.dispatch(event);
            handled += 1;
        }
        handled
    }

    /// Fire the idle timer if it is due.
    pub fn tick(&mut self) -> bool {
        self.manager.check_expiry()
    }

    /// Drive the session manager until `running` is cleared or every sink is
    /// dropped. Wakes at least every `poll_interval`, and exactly at the close
    /// deadline when one is pending.
    pub fn run(&mut self, running: &AtomicBool, poll_interval: Duration) -> RunOutcome {
        while running.load(Ordering::SeqCst) {
            let wait = self
                .manager
                .time_until_close()
                .map_or(poll_interval, |remaining| remaining.min(poll_interval));

            match self.receiver.recv_timeout(wait) {
                Ok(event) => self.dispatch(event),
                Err(RecvTimeoutError::Timeout) => {
                    self.manager.check_expiry();
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.manager.check_expiry();
                    tracing::info!("all producers disconnected");
                    return RunOutcome::Disconnected;
                }
            }
        }
        RunOutcome::Stopped
    }

    /// Clear all sessions and return to idle.
    pub fn reset(&mut self) {
        self.manager.reset();
        self.activity_log.reset();
    }

    /// Stop windowing but keep the store's history for readers.
    pub fn shutdown(&mut self) {
        self.manager.dispose();
    }

    fn dispatch(&mut self, event: PerfEvent) {
        // A close that fell due before this event was delivered happens first.
        self.manager.check_expiry();
        self.manager.handle_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::interaction::{ElementInfo, ID_ATTRIBUTE};
    use crate::collector::types::{FpsData, Interaction, RenderPhase};
    use crate::core::clock::ManualClock;
    use crate::core::windowing::RelayMessage;
    use std::sync::Mutex;

    fn monitor(config: Config) -> (Monitor, EventSink, ManualClock) {
        let clock = ManualClock::new(0.0);
        let (monitor, sink) = Monitor::new(config, Arc::new(clock.clone()), None);
        (monitor, sink, clock)
    }

    #[test]
    fn test_trackers_follow_config() {
        let config = Config {
            track_network: false,
            track_fps: false,
            ..Config::default()
        };
        let (monitor, sink, _clock) = monitor(config);
        let trackers = monitor.trackers(&sink);

        assert!(trackers.network.is_none());
        assert!(trackers.fps.is_none());
        assert!(trackers.long_tasks.is_some());
    }

    #[test]
    fn test_tracked_events_become_sessions() {
        let config = Config::default().with_timeout_ms(Some(200));
        let (mut monitor, sink, clock) = monitor(config);
        let trackers = monitor.trackers(&sink);

        let button = ElementInfo::new("BUTTON").with_attr(ID_ATTRIBUTE, "load-users");
        trackers.interaction.record("click", Some(&button));
        clock.advance(20.0);
        trackers
            .render
            .on_render("UserList", RenderPhase::Mount, 12.0, 10.0, 8.0, 20.0);

        assert_eq!(monitor.process_pending(), 2);
        let state = monitor.store().get_state();
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(state.sessions[0].interaction.id, "load-users");
        assert_eq!(state.sessions[0].renders.len(), 1);

        clock.advance(200.0);
        assert!(monitor.tick());
        assert!(monitor.store().get_state().active_session_id.is_none());
        assert_eq!(monitor.activity_log().stats().sessions_expired, 1);
    }

    #[test]
    fn test_stopped_trackers_emit_nothing() {
        let (mut monitor, sink, _clock) = monitor(Config::default());
        let trackers = monitor.trackers(&sink);
        trackers.stop_all();
        trackers.stop_all();

        trackers.interaction.record("click", None);
        assert_eq!(monitor.process_pending(), 0);
    }

    #[test]
    fn test_due_close_fires_before_next_event() {
        let config = Config::default().with_timeout_ms(Some(100));
        let (mut monitor, sink, clock) = monitor(config);
        sink.send(Interaction::new("a", "click", 0.0));
        monitor.process_pending();

        clock.advance(150.0);
        sink.send(FpsData {
            current: 60,
            min: 60,
            timestamp: 150.0,
        });
        monitor.process_pending();

        let state = monitor.store().get_state();
        assert!(state.sessions[0].fps_samples.is_empty());
        assert!(state.fps.is_some());
        assert_eq!(monitor.activity_log().stats().uncorrelated_events, 1);
    }

    #[test]
    fn test_run_returns_when_sinks_dropped() {
        let (mut monitor, sink, _clock) = monitor(Config::default());
        sink.send(Interaction::new("a", "click", 0.0));
        drop(sink);

        let running = AtomicBool::new(true);
        let outcome = monitor.run(&running, Duration::from_millis(10));

        assert_eq!(outcome, RunOutcome::Disconnected);
        assert_eq!(monitor.store().get_state().sessions.len(), 1);
    }

    #[test]
    fn test_run_stops_on_flag() {
        let (mut monitor, _sink, _clock) = monitor(Config::default());
        let running = AtomicBool::new(false);
        assert_eq!(
            monitor.run(&running, Duration::from_millis(10)),
            RunOutcome::Stopped
        );
    }

    #[test]
    fn test_relay_requires_config_opt_in() {
        let messages = Arc::new(Mutex::new(Vec::<RelayMessage>::new()));
        let sink_messages = Arc::clone(&messages);
        let relay: SessionRelay = Arc::new(move |message: &RelayMessage| {
            sink_messages.lock().unwrap().push(message.clone())
        });
        let clock: SharedClock = Arc::new(ManualClock::new(0.0));

        let (mut silent, sink) =
            Monitor::new(Config::default(), Arc::clone(&clock), Some(Arc::clone(&relay)));
        sink.send(Interaction::new("a", "click", 0.0));
        silent.process_pending();
        assert!(messages.lock().unwrap().is_empty());

        let config = Config {
            relay_sessions: true,
            ..Config::default()
        };
        let (mut relayed, sink) = Monitor::new(config, clock, Some(relay));
        sink.send(Interaction::new("b", "click", 0.0));
        relayed.process_pending();
        assert_eq!(messages.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_shutdown_keeps_history() {
        let (mut monitor, sink, clock) = monitor(Config::default());
        sink.send(Interaction::new("a", "click", 0.0));
        monitor.process_pending();
        monitor.shutdown();

        clock.advance(10_000.0);
        assert!(!monitor.tick());
        assert_eq!(monitor.store().get_state().sessions.len(), 1);
    }
}

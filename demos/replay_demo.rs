//! Demonstration of perf-hud session windowing.
//!
//! This example shows how to:
//! 1. Build a monitor and the trackers its configuration enables
//! 2. Instrument a fetch slot and drive producers on virtual time
//! 3. Watch the store as sessions open and close
//! 4. Print a session summary and timeline
//!
//! Run with: cargo run --example replay_demo

use std::sync::Arc;

use perf_hud::{
    collector::{
        interaction::ID_ATTRIBUTE, longtask::LONG_TASK_ENTRY_TYPE, ElementInfo, FetchError,
        FetchRequest, FetchResponse, FetchSlot, PerformanceEntry, RenderPhase,
    },
    core::{timeline, Clock, ManualClock, SessionSummary, Snapshot},
    runtime::Monitor,
    Config,
};

fn main() {
    println!("perf-hud - Session Demo");
    println!("=======================");
    println!();

    let clock = ManualClock::new(0.0);
    let config = Config::default().with_timeout_ms(Some(500));
    let (mut monitor, sink) = Monitor::new(config, Arc::new(clock.clone()), None);
    let mut trackers = monitor.trackers(&sink);

    let subscription = monitor.store().subscribe(|state: &Snapshot| {
        println!(
            "  store: {} session(s), active: {}",
            state.sessions.len(),
            state.active_session_id.as_deref().unwrap_or("none")
        );
    });

    // A fake backend that takes 80ms to answer.
    let backend_clock = clock.clone();
    let slot = FetchSlot::new(move |_request: &FetchRequest| -> Result<FetchResponse, FetchError> {
        backend_clock.advance(80.0);
        Ok(FetchResponse {
            status: 200,
            body: br#"[{"id":1}]"#.to_vec(),
        })
    });
    if let Some(network) = &trackers.network {
        network.start(&slot);
    }

    println!("Clicking \"Load users\"...");
    let button = ElementInfo::new("BUTTON")
        .with_text("Load users")
        .with_parent(ElementInfo::new("SECTION").with_attr(ID_ATTRIBUTE, "load-users"));
    trackers.interaction.record("click", Some(&button));
    monitor.process_pending();

    clock.advance(5.0);
    if let Err(e) = slot.fetch(&FetchRequest::get("/api/users")) {
        eprintln!("fetch failed: {e}");
    }
    monitor.process_pending();

    let start = clock.now_ms();
    clock.advance(14.0);
    trackers
        .render
        .on_render("UserList", RenderPhase::Mount, 14.0, 18.0, start, clock.now_ms());
    if let Some(long_tasks) = &trackers.long_tasks {
        long_tasks.observe(&[PerformanceEntry {
            name: "self".to_string(),
            entry_type: LONG_TASK_ENTRY_TYPE.to_string(),
            start_time: start,
            duration: 62.0,
            attribution: None,
        }]);
    }
    if let Some(fps) = trackers.fps.as_mut() {
        for frame in 0..=60 {
            fps.on_frame(f64::from(frame) * 16.7);
        }
    }
    monitor.process_pending();

    println!();
    println!("Waiting out the idle timeout...");
    clock.advance(500.0);
    monitor.tick();

    subscription.unsubscribe();
    trackers.stop_all();

    let state = monitor.store().get_state();
    for session in &state.sessions {
        println!();
        let fps = state.fps.map(|sample| sample.current);
        println!(
            "{}",
            SessionSummary::compute(Some(session.as_ref()), fps, clock.now_ms())
        );
        for item in timeline(session) {
            println!(
                "    +{:>6.1}ms  {:<12} {:.1}ms",
                item.offset_ms, item.label, item.duration_ms
            );
        }
    }

    println!();
    println!("{}", monitor.activity_log().summary());
}

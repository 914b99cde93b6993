//! perf-hud CLI
//!
//! Replays or watches JSON Lines performance event streams and reports the
//! interaction sessions they form.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use perf_hud::{
    config::Config,
    core::{
        timeline, Clock, ManualClock, MonotonicClock, PerformanceSession, RelayMessage,
        SessionRelay, SessionSummary, SharedClock, Snapshot, TimelineItemKind,
    },
    runtime::{EventSink, Monitor, RunOutcome},
    stream::{EventReader, EventStreamError},
    VERSION,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Upper bound on how long the watch loop sleeps between checks.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "perf-hud")]
#[command(version = VERSION)]
#[command(about = "Interaction-scoped performance sessions from UI event streams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded JSONL event stream on virtual time
    ///
    /// Virtual time moves to each event's end before it is handled, so an
    /// event that ends after its session's idle deadline is counted as
    /// uncorrelated rather than attached to that session.
    Replay {
        /// Event stream, one JSON event per line
        file: PathBuf,

        /// Idle timeout before a session closes (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the final store snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read JSONL events from stdin and report sessions as they close
    Watch {
        /// Idle timeout before a session closes (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print relay messages as JSON lines on stdout
        #[arg(long)]
        relay: bool,
    },

    /// Show configuration
    Config,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            file,
            timeout_ms,
            json,
        } => cmd_replay(&file, timeout_ms, json),
        Commands::Watch { timeout_ms, relay } => cmd_watch(timeout_ms, relay),
        Commands::Config => cmd_config(),
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("perf_hud=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(timeout_ms: Option<u64>) -> Result<Config> {
    let path = Config::config_path();
    let config = Config::load_from(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    Ok(config.with_timeout_ms(timeout_ms))
}

fn cmd_replay(path: &Path, timeout_ms: Option<u64>, json: bool) -> Result<()> {
    let config = load_config(timeout_ms)?;
    let timeout_ms = config.session_timeout.as_secs_f64() * 1000.0;
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let clock = ManualClock::new(0.0);
    let (mut monitor, sink) = Monitor::new(config, Arc::new(clock.clone()), None);

    let mut replayed = 0usize;
    for event in EventReader::new(BufReader::new(file)) {
        let event = event.with_context(|| format!("failed to replay {}", path.display()))?;
        clock.advance_to(event.activity_end());
        sink.send(event);
        replayed += monitor.process_pending();
    }

    // Let the last session run out its idle timeout.
    clock.advance(timeout_ms);
    monitor.tick();
    tracing::info!(events = replayed, "replay finished");

    let state = monitor.store().get_state();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&*state).context("failed to serialize snapshot")?
        );
        return Ok(());
    }

    if state.sessions.is_empty() {
        println!("No sessions found in {}", path.display());
        return Ok(());
    }

    for session in &state.sessions {
        print_session(session, &state, clock.now_ms());
    }
    println!("{}", monitor.activity_log().summary());
    Ok(())
}

fn cmd_watch(timeout_ms: Option<u64>, relay: bool) -> Result<()> {
    let mut config = load_config(timeout_ms)?;
    config.relay_sessions |= relay;

    println!("perf-hud v{VERSION}");
    println!(
        "  Session timeout: {}ms",
        config.session_timeout.as_millis()
    );
    println!(
        "  Relay: {}",
        if config.relay_sessions {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!();
    println!("Reading events from stdin. Press Ctrl+C to stop");
    println!();

    let clock: SharedClock = Arc::new(MonotonicClock::new());
    let (mut monitor, sink) = Monitor::new(config, Arc::clone(&clock), Some(stdout_relay()));
    let subscription = monitor.store().subscribe(close_reporter(Arc::clone(&clock)));

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(Arc::clone(&running))?;

    let reader = thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || forward_stdin(sink))
        .context("failed to spawn stdin reader")?;

    let outcome = monitor.run(&running, POLL_INTERVAL);
    if outcome == RunOutcome::Disconnected {
        // stdin hit EOF; the reader has already returned.
        match reader.join() {
            Ok(forwarded) => tracing::info!(events = forwarded, "input stream ended"),
            Err(_) => tracing::warn!("stdin reader panicked"),
        }
    }

    subscription.unsubscribe();
    monitor.shutdown();

    println!();
    println!("{}", monitor.activity_log().summary());
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = load_config(None)?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("failed to serialize configuration")?
    );
    Ok(())
}

/// Forward stdin events into `sink` until EOF. Returns the number forwarded.
fn forward_stdin(sink: EventSink) -> usize {
    let stdin = std::io::stdin();
    let mut forwarded = 0;

    for event in EventReader::new(stdin.lock()) {
        match event {
            Ok(event) => {
                if !sink.send(event) {
                    break;
                }
                forwarded += 1;
            }
            Err(e @ EventStreamError::Parse { .. }) => {
                tracing::warn!(error = %e, "skipping invalid event");
            }
            Err(e) => {
                tracing::warn!(error = %e, "stopped reading stdin");
                break;
            }
        }
    }
    forwarded
}

/// Relay that writes each message as one JSON line on stdout.
fn stdout_relay() -> SessionRelay {
    Arc::new(|message: &RelayMessage| match serde_json::to_string(message) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "failed to serialize relay message"),
    })
}

/// Store listener that prints a summary whenever the active session changes
/// away from one it saw open.
fn close_reporter(clock: SharedClock) -> impl Fn(&Snapshot) + Send + Sync + 'static {
    let open = Mutex::new(None::<String>);
    move |state: &Snapshot| {
        let mut open = open.lock().unwrap_or_else(PoisonError::into_inner);
        if *open == state.active_session_id {
            return;
        }
        if let Some(closed) = open.as_deref().and_then(|id| state.session(id)) {
            let fps = closed
                .fps_samples
                .last()
                .or(state.fps.as_ref())
                .map(|sample| sample.current);
            let summary = SessionSummary::compute(Some(closed.as_ref()), fps, clock.now_ms());
            println!("[{}] {summary}", chrono::Local::now().format("%H:%M:%S"));
            println!();
        }
        *open = state.active_session_id.clone();
    }
}

fn print_session(session: &PerformanceSession, state: &Snapshot, now_ms: f64) {
    let fps = session
        .fps_samples
        .last()
        .or(state.fps.as_ref())
        .map(|sample| sample.current);

    println!("Session {}", session.id);
    println!("{}", SessionSummary::compute(Some(session), fps, now_ms));
    println!("  Timeline:");
    for item in timeline(session) {
        let kind = match item.kind {
            TimelineItemKind::Interaction => "interaction",
            TimelineItemKind::Render => "render",
            TimelineItemKind::Network => "network",
            TimelineItemKind::LongTask => "longtask",
        };
        let detail = item
            .detail
            .map(|detail| format!(" ({detail})"))
            .unwrap_or_default();
        println!(
            "    +{:>8.1}ms  {kind:<11} {}{detail}  {:.1}ms",
            item.offset_ms, item.label, item.duration_ms
        );
    }
    println!();
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")
}

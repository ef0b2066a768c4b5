//! Replay command - play a recorded history in real time.
//!
//! Location samples are published through a location feed, status ticks
//! drive the progress bar, and `initial_route` events request a route from
//! the last replayed location through a route session backed by the
//! straight-line demo router.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use navreplay::config::ConfigFile;
use navreplay::directions::{RouteSession, RoutesRequestCallback};
use navreplay::geo::Location;
use navreplay::history::{ReplayEvent, ReplayEventInitialRoute, ReplaySequence};
use navreplay::location::{LocationFeed, LocationObserver};
use navreplay::replay::{
    PlayerState, ReplayEvents, ReplayHistoryPlayer, ReplayLocationEngine, ReplayProgress,
    ReplayProgressFeed,
};
use navreplay::route::{RouteOptions, RouteSet};
use navreplay::router::RouterError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::common::{format_duration, load_sequence, resolve_order, resolve_speed, OrderPolicy};
use crate::error::CliError;
use crate::router::DirectLineRouter;

/// Arguments for the replay command.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Recorded history file (JSON)
    pub path: PathBuf,

    /// Playback speed multiplier (0.1 to 10)
    #[arg(long)]
    pub speed: Option<f64>,

    /// Out-of-order timestamp policy
    #[arg(long, value_enum)]
    pub order: Option<OrderPolicy>,

    /// Start this many seconds into the recording
    #[arg(long, value_name = "SECONDS")]
    pub start_at: Option<f64>,

    /// Simulated router latency in milliseconds
    #[arg(long, default_value_t = 50)]
    pub router_latency_ms: u64,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Outcome of a replay run.
#[derive(Debug)]
struct ReplayReport {
    state: PlayerState,
    events_dispatched: usize,
    total_events: usize,
    position: Duration,
    routes: RouteSet,
}

/// Run the replay command.
pub fn run(args: ReplayArgs, config: &ConfigFile) -> Result<(), CliError> {
    let order = resolve_order(args.order, config);
    let speed = resolve_speed(args.speed, config)?;
    let start_at = match args.start_at {
        Some(seconds) => Some(Duration::try_from_secs_f64(seconds).map_err(|_| {
            CliError::Config(format!("invalid start offset {}", seconds))
        })?),
        None => None,
    };
    let sequence = load_sequence(&args.path, order)?;

    println!("NavReplay v{}", navreplay::VERSION);
    println!("================");
    println!();
    println!("History: {}", args.path.display());
    println!("Events:  {}", sequence.len());
    println!("Length:  {}", format_duration(sequence.duration()));
    println!("Speed:   {}x", speed);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let report = runtime.block_on(replay(sequence, speed, start_at, &args))?;

    println!();
    println!("Replay Summary");
    println!("──────────────");
    println!("  State:    {}", report.state);
    println!(
        "  Events:   {}/{}",
        report.events_dispatched, report.total_events
    );
    println!("  Position: {}", format_duration(report.position));
    match report.routes.primary() {
        Some(route) => println!(
            "  Route:    {:.2} km, {} leg(s)",
            route.distance / 1000.0,
            route.leg_count
        ),
        None => println!("  Route:    (none)"),
    }
    Ok(())
}

async fn replay(
    sequence: ReplaySequence,
    speed: f64,
    start_at: Option<Duration>,
    args: &ReplayArgs,
) -> Result<ReplayReport, CliError> {
    let total_events = sequence.len();
    let out = Output::new(total_events as u64, !args.no_progress);

    let player = ReplayHistoryPlayer::new(sequence);
    player.set_playback_speed(speed);
    if let Some(offset) = start_at {
        player.seek(offset);
    }

    // Locations first so an initial route in the same batch sees them
    let feed = Arc::new(LocationFeed::new());
    feed.register_location_observer(Arc::new(LocationPrinter { out: out.clone() }));
    let _location_engine = ReplayLocationEngine::attach(&player, Arc::clone(&feed));

    let router = DirectLineRouter::new(Duration::from_millis(args.router_latency_ms));
    let session = RouteSession::new(Arc::new(router));
    session.register_routes_observer(Arc::new(|routes: &RouteSet| {
        info!(routes = routes.len(), "Routes changed");
    }));

    let batch_out = out.clone();
    let batch_session = session.clone();
    let batch_feed = Arc::clone(&feed);
    player.observe_replay_events(Arc::new(move |batch: &ReplayEvents| {
        batch_out.advance_to((batch.first_index + batch.len()) as u64);
        for event in batch.iter() {
            handle_event(event, &batch_session, &batch_feed, &batch_out);
        }
    }));

    let progress = ReplayProgressFeed::attach(&player);
    let progress_out = out.clone();
    progress.register_progress_observer(Arc::new(move |p: &ReplayProgress| {
        progress_out.status(p);
    }));

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || signal.cancel())
        .map_err(|e| CliError::Signal(e.to_string()))?;

    player.play();
    let state = tokio::select! {
        state = player.wait_until_terminal() => state,
        _ = shutdown.cancelled() => {
            out.line("Received shutdown signal, stopping replay...");
            player.stop();
            player.state()
        }
    };
    out.finish();

    session.shut_down_session();
    session.unregister_all_routes_observers();
    feed.unregister_all_location_observers();

    debug!(%state, "Replay command done");
    Ok(ReplayReport {
        state,
        events_dispatched: player.events_dispatched(),
        total_events,
        position: player.position(),
        routes: session.routes(),
    })
}

fn handle_event(event: &ReplayEvent, session: &RouteSession, feed: &LocationFeed, out: &Output) {
    match event {
        // Printed through the location feed
        ReplayEvent::UpdateLocation(_) => {}
        // Reported by the progress feed
        ReplayEvent::GetStatus(_) => {}
        ReplayEvent::InitialRoute(route) => request_initial_route(route, session, feed, out),
        ReplayEvent::StartTransit(transit) => out.line(format!(
            "{} start ({})",
            style("transit").magenta(),
            transit.properties
        )),
        ReplayEvent::EndTransit(transit) => out.line(format!(
            "{} end ({})",
            style("transit").magenta(),
            transit.properties
        )),
        ReplayEvent::Custom(custom) => {
            out.line(format!("{} {}", style("event").dim(), custom.event_type))
        }
    }
}

/// Request a route from the last replayed location to the recorded destination.
fn request_initial_route(
    event: &ReplayEventInitialRoute,
    session: &RouteSession,
    feed: &LocationFeed,
    out: &Output,
) {
    let Some(destination) = event.coordinates.last().copied() else {
        warn!("Initial route event without coordinates");
        return;
    };
    let origin = feed
        .last_location()
        .map(|location| location.point())
        .or_else(|| event.coordinates.first().copied())
        .unwrap_or(destination);

    let options = RouteOptions::builder()
        .coordinates(origin, None, destination)
        .build();
    out.line(format!(
        "{} requesting {} -> {}",
        style("route").green(),
        origin,
        destination
    ));
    session.request_routes(options, Some(Arc::new(RouteRequestPrinter { out: out.clone() })));
}

/// Console output that cooperates with the progress bar.
#[derive(Clone)]
struct Output {
    bar: ProgressBar,
}

impl Output {
    fn new(total: u64, show_progress: bool) -> Self {
        let bar = if show_progress && total > 0 {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            ) {
                bar.set_style(style.progress_chars("=> "));
            }
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    fn line(&self, message: impl AsRef<str>) {
        if self.bar.is_hidden() {
            println!("{}", message.as_ref());
        } else {
            self.bar.println(message);
        }
    }

    fn advance_to(&self, position: u64) {
        self.bar.set_position(position);
    }

    fn status(&self, progress: &ReplayProgress) {
        self.bar.set_message(format!(
            "{} / {}",
            format_duration(progress.position),
            format_duration(progress.duration)
        ));
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

struct LocationPrinter {
    out: Output,
}

impl LocationObserver for LocationPrinter {
    fn on_raw_location_changed(&self, raw_location: &Location) {
        debug!(
            lat = raw_location.latitude,
            lon = raw_location.longitude,
            time = raw_location.time,
            "Raw location"
        );
    }

    fn on_enhanced_location_changed(&self, location: &Location, key_points: &[Location]) {
        let speed = location
            .speed
            .map(|s| format!("  {:.1} m/s", s))
            .unwrap_or_default();
        let keys = if key_points.len() > 1 {
            format!("  (+{} key points)", key_points.len())
        } else {
            String::new()
        };
        self.out.line(format!(
            "{} {}{}{}",
            style("location").cyan(),
            location.point(),
            speed,
            keys
        ));
    }
}

struct RouteRequestPrinter {
    out: Output,
}

impl RoutesRequestCallback for RouteRequestPrinter {
    fn on_routes_ready(&self, routes: &RouteSet) {
        if let Some(route) = routes.primary() {
            self.out.line(format!(
                "{} ready: {:.2} km, ~{}",
                style("route").green(),
                route.distance / 1000.0,
                format_duration(Duration::try_from_secs_f64(route.duration).unwrap_or_default())
            ));
        }
    }

    fn on_routes_request_failure(&self, error: &RouterError, _options: &RouteOptions) {
        self.out
            .line(format!("{} request failed: {}", style("route").red(), error));
    }

    fn on_routes_request_canceled(&self, _options: &RouteOptions) {
        debug!("Initial route request canceled");
    }
}

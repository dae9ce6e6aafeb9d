//! Walk simulator for the monitoring session.
//!
//! Generates a pedestrian track past the loaded hazard zones and feeds it
//! through a full monitoring session on simulated time, printing every alert
//! the session fires.

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use hazard_cli::sim::paths::WALKING_SPEED_MPS;
use hazard_cli::{sample_track, CircularWalk, LinearWalk, WalkPath};
use hazard_monitor::{
    AlertDispatcher, ChannelLocationStream, ChannelSink, Config, ConfigKey, ConfigStore,
    HazardStore, ManualClock, MemoryConfigStore, MonitoringSession,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shape {
    Line,
    Loop,
}

/// Simulate walking past hazard zones and report alerts
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Start latitude (or loop centre)
    #[arg(long, allow_hyphen_values = true, default_value_t = -16.4090)]
    lat: f64,

    /// Start longitude (or loop centre)
    #[arg(long, allow_hyphen_values = true, default_value_t = -71.5375)]
    lon: f64,

    /// Walk shape
    #[arg(long, value_enum, default_value_t = Shape::Line)]
    shape: Shape,

    /// Heading in degrees for a line walk (0 = north)
    #[arg(long, default_value_t = 0.0)]
    bearing: f64,

    /// Line length, or loop radius, in meters
    #[arg(long, default_value_t = 2000.0)]
    distance: f64,

    /// Walking speed in m/s
    #[arg(long, default_value_t = WALKING_SPEED_MPS)]
    speed: f64,

    /// Seconds between GPS fixes
    #[arg(long, default_value_t = 30)]
    step: u64,

    /// Maximum GPS noise in meters
    #[arg(long, default_value_t = 5.0)]
    jitter: f64,

    /// Default alert radius in meters
    #[arg(long, default_value_t = 500.0)]
    radius: f64,

    /// Per-zone cooldown in milliseconds
    #[arg(long, default_value_t = 300_000)]
    cooldown_ms: u64,

    /// Hazard REST API base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Crime records feed base URL
    #[arg(long)]
    records_url: Option<String>,

    /// JSON file of hazard zones
    #[arg(long)]
    file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("hazard_monitor=info".parse()?))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if args.api_url.is_some() {
        config.api_url = args.api_url.clone();
    }
    if args.records_url.is_some() {
        config.records_url = args.records_url.clone();
    }
    if args.file.is_some() {
        config.file_path = args.file.clone();
    }
    let sources = config.build_source();
    if sources.is_empty() {
        bail!("no hazard source configured; pass --api-url, --records-url or --file");
    }

    let path: Box<dyn WalkPath> = match args.shape {
        Shape::Line => Box::new(LinearWalk::heading(
            args.lat,
            args.lon,
            args.bearing,
            args.distance,
            args.speed,
        )),
        Shape::Loop => Box::new(CircularWalk::new(
            args.lat,
            args.lon,
            args.distance,
            args.speed,
            false,
        )),
    };

    let start = Utc::now();
    let track = sample_track(
        path.as_ref(),
        Duration::from_secs(args.step.max(1)),
        start,
        args.jitter,
        &mut rand::rng(),
    );

    let clock = Arc::new(ManualClock::new(start));
    let store = Arc::new(
        HazardStore::new(Arc::new(sources)).with_limits(config.fetch_limit, config.fetch_timeout),
    );
    let (sink, mut alerts) = ChannelSink::channel();
    let dispatcher = AlertDispatcher::new(store, clock.clone())
        .with_policy(config.match_policy)
        .with_sink(Arc::new(sink));

    let settings = Arc::new(MemoryConfigStore::new());
    settings.set(ConfigKey::AlertRadiusM, args.radius.into())?;
    settings.set(ConfigKey::CooldownMs, (args.cooldown_ms as i64).into())?;

    let feed = ChannelLocationStream::new();
    let session = MonitoringSession::new(Arc::new(dispatcher), Arc::new(feed.clone()), settings);
    session.start().await?;
    let loaded = session.reload().await?;

    println!(
        "Walking {:.0}s ({} fixes) past {} hazard zones",
        path.duration_secs(),
        track.len(),
        loaded
    );
    println!();

    let mut fired = 0u32;
    for (idx, position) in track.iter().enumerate() {
        clock.set(position.timestamp);
        if !feed.push(*position) {
            eprintln!("Fix {} dropped", idx);
            continue;
        }
        // Single-threaded runtime: once the sample loop has taken the fix it
        // has also evaluated it.
        while feed.pending() > 0 {
            tokio::task::yield_now().await;
        }

        while let Ok(event) = alerts.try_recv() {
            fired += 1;
            let elapsed = (event.fired_at - start).num_seconds();
            println!(
                "[t+{:>5}s] ({:.6}, {:.6}) ALERT {} [{}]",
                elapsed,
                position.lat,
                position.lon,
                event.headline(),
                event.zone.severity
            );
        }
    }

    session.stop().await;
    println!("\nWalk complete. {} alerts fired.", fired);
    Ok(())
}

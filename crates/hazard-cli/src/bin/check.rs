//! One-shot hazard proximity check for a single position.
//!
//! Loads zones from the configured sources (flags override the HAZARD_*
//! environment) and reports which zone would alert at that point.

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Parser;
use hazard_core::{haversine_distance, HazardZone, MatchPolicy, Position};
use hazard_monitor::Config;
use hazard_sources::{ApiSource, HazardSource};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Check a position against the hazard zone set
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Latitude to check
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude to check
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Default alert radius in meters for zones without their own
    #[arg(long, default_value_t = 500.0)]
    radius: f64,

    /// Which zone wins when several qualify (first|nearest)
    #[arg(long, default_value = "first")]
    policy: MatchPolicy,

    /// Hazard REST API base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Crime records feed base URL
    #[arg(long)]
    records_url: Option<String>,

    /// JSON file of hazard zones
    #[arg(long)]
    file: Option<PathBuf>,

    /// Ask the API for nearby zones instead of loading the full set
    #[arg(long)]
    nearby: bool,

    /// Also list every zone within this many meters
    #[arg(long, default_value_t = 1000.0)]
    list_within: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("hazard_sources=info".parse()?))
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

    let zones = if args.nearby {
        let Some(url) = &config.api_url else {
            bail!("--nearby needs --api-url or HAZARD_API_URL");
        };
        ApiSource::with_timeout(url.clone(), config.fetch_timeout)
            .fetch_nearby(args.lat, args.lon, args.list_within)
            .await?
    } else {
        let chain = config.build_source();
        if chain.is_empty() {
            bail!("no hazard source configured; pass --api-url, --records-url or --file");
        }
        chain.fetch_hazards(config.fetch_limit).await?
    };

    println!("Loaded {} hazard zones", zones.len());
    let position = Position::new(args.lat, args.lon, Utc::now());

    match args.policy.find(&position, &zones, args.radius) {
        Some((zone, distance)) => println!(
            "ALERT  {} [{}] {:.0}m away (radius {:.0}m) id={}",
            zone.label,
            zone.severity,
            distance,
            zone.effective_radius_m(args.radius),
            zone.id
        ),
        None => println!("No hazard zone covers ({:.6}, {:.6})", args.lat, args.lon),
    }

    let mut nearby: Vec<(&HazardZone, f64)> = zones
        .iter()
        .map(|zone| (zone, haversine_distance(args.lat, args.lon, zone.lat, zone.lon)))
        .filter(|(_, distance)| *distance <= args.list_within)
        .collect();
    nearby.sort_by(|a, b| a.1.total_cmp(&b.1));

    if !nearby.is_empty() {
        println!("\nZones within {:.0}m:", args.list_within);
        for (zone, distance) in nearby {
            println!(
                "  {:>6.0}m  {:<6}  {}  ({})",
                distance,
                zone.severity.to_string(),
                zone.label,
                zone.id
            );
        }
    }

    Ok(())
}

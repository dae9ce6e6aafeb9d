//! Hazard Monitor - always-on proximity alerting service

use anyhow::{Context, Result};
use hazard_core::Position;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hazard_monitor::{
    AlertDispatcher, ChannelLocationStream, Config, ConfigStore, HazardStore,
    JsonFileConfigStore, LocationStream, LogSink, MonitoringSession, ReplayLocationStream,
    SessionOptions, SystemClock, WebhookSink,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("hazard_monitor=info".parse()?))
        .init();

    tracing::info!("Starting Hazard Monitor...");

    let config = Config::from_env();
    let sources = config.build_source();
    if sources.is_empty() {
        tracing::warn!("No hazard sources configured; set HAZARD_API_URL, HAZARD_RECORDS_URL or HAZARD_FILE_PATH");
    } else {
        tracing::info!("Hazard sources: {}", sources.names().join(" -> "));
    }

    let store = Arc::new(
        HazardStore::new(Arc::new(sources)).with_limits(config.fetch_limit, config.fetch_timeout),
    );
    let settings = Arc::new(
        JsonFileConfigStore::open(&config.config_path)
            .with_context(|| format!("opening settings at {}", config.config_path.display()))?,
    );

    let mut dispatcher = AlertDispatcher::new(store, Arc::new(SystemClock))
        .with_policy(config.match_policy)
        .with_config(settings.load_session_config())
        .with_sink(Arc::new(LogSink));
    if let Some(url) = &config.webhook_url {
        tracing::info!("Forwarding alerts to {}", url);
        dispatcher = dispatcher.with_sink(Arc::new(WebhookSink::new(url.clone())));
    }

    let locations: Arc<dyn LocationStream> = match &config.replay_path {
        Some(path) => {
            let replay = ReplayLocationStream::from_json_lines(path, config.replay_interval)
                .with_context(|| format!("loading replay track {}", path.display()))?
                .restamped();
            tracing::info!("Replaying {} positions from {}", replay.len(), path.display());
            Arc::new(replay)
        }
        None => {
            tracing::info!("Reading positions as JSON lines from stdin");
            let stream = ChannelLocationStream::new();
            tokio::spawn(feed_from_stdin(stream.clone()));
            Arc::new(stream)
        }
    };

    let session = MonitoringSession::new(Arc::new(dispatcher), locations, settings).with_options(
        SessionOptions {
            refresh_interval: config.refresh_interval,
            ..SessionOptions::default()
        },
    );

    if !session.resume_if_persisted().await? {
        session.start().await?;
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    session.shutdown().await;

    Ok(())
}

async fn feed_from_stdin(stream: ChannelLocationStream) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match serde_json::from_str::<Position>(&line) {
                Ok(position) => {
                    if !stream.push(position) {
                        tracing::debug!("Dropped position; no active subscriber");
                    }
                }
                Err(err) => tracing::warn!("Ignoring malformed position: {}", err),
            },
            Ok(None) => break,
            Err(err) => {
                tracing::warn!("Reading stdin failed: {}", err);
                break;
            }
        }
    }
    tracing::info!("Position input closed");
    stream.end();
}

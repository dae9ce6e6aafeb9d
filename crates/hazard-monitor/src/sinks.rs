//! Alert sinks: where fired alerts go.
//!
//! Sinks are called while the dispatcher holds its throttle lock, so `emit`
//! must hand work off instead of blocking.

use hazard_core::{AlertEvent, EmissionError};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::mpsc;

pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;

    /// Present an alert. Fire-and-forget; delivery is not verified.
    fn emit(&self, event: &AlertEvent) -> Result<(), EmissionError>;

    /// Release device handles (audio, vibration) when monitoring stops.
    fn release(&self) {}
}

/// Writes alerts to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn emit(&self, event: &AlertEvent) -> Result<(), EmissionError> {
        tracing::warn!(
            zone = %event.zone.id,
            severity = %event.zone.severity,
            distance_m = event.distance_m as i64,
            "Hazard nearby: {}",
            event.headline()
        );
        if event.cue.play_sound {
            tracing::info!("Alert tone at {}% volume", event.cue.volume_percent);
        }
        if event.cue.vibrate {
            tracing::info!("Vibration pattern {:?}", event.cue.vibration_pattern_ms);
        }
        Ok(())
    }
}

/// POSTs each alert as JSON to a webhook on a background task.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!("Falling back to default webhook client: {}", err);
                Client::new()
            });
        Self {
            client,
            url: url.into(),
        }
    }
}

impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    fn emit(&self, event: &AlertEvent) -> Result<(), EmissionError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|err| {
            EmissionError::Unavailable {
                sink: self.name().to_string(),
                reason: err.to_string(),
            }
        })?;

        let request = self.client.post(&self.url).json(event);
        let zone_id = event.zone.id.clone();
        runtime.spawn(async move {
            match request.send().await.and_then(|resp| resp.error_for_status()) {
                Ok(_) => tracing::debug!("Webhook delivered alert for {}", zone_id),
                Err(err) => tracing::warn!("Webhook delivery for {} failed: {}", zone_id, err),
            }
        });
        Ok(())
    }
}

/// Forwards alerts into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<AlertEvent>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AlertEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl AlertSink for ChannelSink {
    fn name(&self) -> &str {
        "channel"
    }

    fn emit(&self, event: &AlertEvent) -> Result<(), EmissionError> {
        self.sender
            .send(event.clone())
            .map_err(|_| EmissionError::Unavailable {
                sink: self.name().to_string(),
                reason: "receiver dropped".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hazard_core::{AlertCue, HazardZone, SessionConfig, Severity};

    fn event() -> AlertEvent {
        AlertEvent {
            zone: HazardZone::new("z1", -16.409, -71.5375, Severity::High, "ROBBERY"),
            distance_m: 312.7,
            fired_at: Utc::now(),
            cue: AlertCue::from_config(&SessionConfig::default()),
        }
    }

    #[test]
    fn log_sink_accepts_alerts() {
        assert!(LogSink.emit(&event()).is_ok());
    }

    #[test]
    fn channel_sink_forwards_and_reports_closed_receiver() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.emit(&event()).unwrap();
        assert_eq!(rx.try_recv().unwrap().headline(), "ROBBERY - 312m away");

        drop(rx);
        assert!(matches!(
            sink.emit(&event()),
            Err(EmissionError::Unavailable { .. })
        ));
    }

    #[test]
    fn webhook_sink_needs_a_runtime() {
        let sink = WebhookSink::new("http://127.0.0.1:9/alerts");
        assert!(matches!(
            sink.emit(&event()),
            Err(EmissionError::Unavailable { .. })
        ));
    }
}

//! Hazard monitoring runtime: hazard store, alert dispatch and the
//! monitoring session that ties them to a location stream.

pub mod backoff;
pub mod clock;
pub mod config;
pub mod config_store;
pub mod dispatcher;
pub mod location;
pub mod loops;
pub mod session;
pub mod sinks;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use config_store::{ConfigKey, ConfigStore, ConfigValue, JsonFileConfigStore, MemoryConfigStore};
pub use dispatcher::AlertDispatcher;
pub use location::{
    ChannelLocationStream, LocationRequest, LocationStream, LocationSubscription,
    ReplayLocationStream,
};
pub use session::{MonitoringSession, SessionError, SessionOptions, SessionState};
pub use sinks::{AlertSink, ChannelSink, LogSink, WebhookSink};
pub use store::HazardStore;

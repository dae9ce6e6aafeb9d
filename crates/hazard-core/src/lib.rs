pub mod classify;
pub mod error;
pub mod models;
pub mod proximity;
pub mod spatial;
pub mod throttle;

pub use classify::classify_crime;
pub use error::{ConfigStoreError, EmissionError, FetchError, SubscriptionError};
pub use models::{AlertCue, AlertEvent, HazardZone, Position, SessionConfig, Severity};
pub use proximity::{find_nearest_zone, find_qualifying_zone, MatchPolicy};
pub use spatial::haversine_distance;
pub use throttle::AlertThrottle;

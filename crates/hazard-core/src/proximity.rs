//! Proximity evaluation of a position against a hazard set.

use serde::{Deserialize, Serialize};

use crate::models::{HazardZone, Position};
use crate::spatial::haversine_distance;

/// Which qualifying zone wins when several cover the same position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// First qualifying zone in store order
    #[default]
    First,
    /// Closest qualifying zone
    Nearest,
}

impl MatchPolicy {
    pub fn find<'a>(
        self,
        position: &Position,
        hazards: &'a [HazardZone],
        default_radius_m: f64,
    ) -> Option<(&'a HazardZone, f64)> {
        match self {
            MatchPolicy::First => find_qualifying_zone(position, hazards, default_radius_m),
            MatchPolicy::Nearest => find_nearest_zone(position, hazards, default_radius_m),
        }
    }
}

impl std::str::FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(MatchPolicy::First),
            "nearest" => Ok(MatchPolicy::Nearest),
            other => Err(format!("unknown match policy '{}'", other)),
        }
    }
}

fn qualifying<'a>(
    position: Position,
    hazards: &'a [HazardZone],
    default_radius_m: f64,
) -> impl Iterator<Item = (&'a HazardZone, f64)> + 'a {
    hazards.iter().filter_map(move |zone| {
        let distance = haversine_distance(position.lat, position.lon, zone.lat, zone.lon);
        (distance <= zone.effective_radius_m(default_radius_m)).then_some((zone, distance))
    })
}

/// Return the first zone, in iteration order, whose effective radius covers
/// `position`, together with the distance to its center in meters.
///
/// Evaluation stops at the first match, so an earlier zone wins over a
/// closer one listed later.
pub fn find_qualifying_zone<'a>(
    position: &Position,
    hazards: &'a [HazardZone],
    default_radius_m: f64,
) -> Option<(&'a HazardZone, f64)> {
    qualifying(*position, hazards, default_radius_m).next()
}

/// Return the closest qualifying zone. Ties keep the earlier zone.
pub fn find_nearest_zone<'a>(
    position: &Position,
    hazards: &'a [HazardZone],
    default_radius_m: f64,
) -> Option<(&'a HazardZone, f64)> {
    qualifying(*position, hazards, default_radius_m).fold(None, |best, candidate| match best {
        Some((_, best_dist)) if best_dist <= candidate.1 => best,
        _ => Some(candidate),
    })
}

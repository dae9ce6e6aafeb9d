//! Turn a walk into timestamped GPS samples.

use chrono::{DateTime, Utc};
use hazard_core::spatial::destination_point;
use hazard_core::Position;
use rand::Rng;
use std::f64::consts::PI;
use std::time::Duration;

use super::paths::WalkPath;

/// Sample `path` every `step`, always including the final position.
///
/// Each fix is displaced by up to `jitter_m` in a random direction to mimic
/// consumer GPS noise; `jitter_m == 0` gives the exact path.
pub fn sample_track<R: Rng + ?Sized>(
    path: &dyn WalkPath,
    step: Duration,
    start: DateTime<Utc>,
    jitter_m: f64,
    rng: &mut R,
) -> Vec<Position> {
    let step_secs = step.as_secs_f64().max(0.001);
    let duration = path.duration_secs();

    let mut offsets = Vec::new();
    let mut t = 0.0;
    while t < duration {
        offsets.push(t);
        t += step_secs;
    }
    offsets.push(duration);

    offsets
        .into_iter()
        .map(|t| {
            let (mut lat, mut lon) = path.position_at(t);
            if jitter_m > 0.0 {
                let bearing = rng.random_range(0.0..2.0 * PI);
                let offset = rng.random_range(0.0..=jitter_m);
                (lat, lon) = destination_point(lat, lon, offset, bearing);
            }
            let at = start + chrono::Duration::milliseconds((t * 1000.0).round() as i64);
            let position = Position::new(lat, lon, at);
            if jitter_m > 0.0 {
                position.with_accuracy(jitter_m)
            } else {
                position
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::paths::LinearWalk;
    use hazard_core::haversine_distance;

    #[test]
    fn samples_cover_the_whole_walk() {
        let walk = LinearWalk::heading(-16.4090, -71.5375, 0.0, 140.0, 1.4);
        let start = Utc::now();
        let track = sample_track(&walk, Duration::from_secs(30), start, 0.0, &mut rand::rng());

        // 0, 30, 60, 90 and the 100 s finish
        assert_eq!(track.len(), 5);
        assert_eq!(track[0].timestamp, start);
        assert_eq!(track[4].timestamp, start + chrono::Duration::seconds(100));
        assert!(track.iter().all(|p| p.accuracy_m.is_none()));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let walk = LinearWalk::heading(-16.4090, -71.5375, 45.0, 300.0, 1.4);
        let exact = sample_track(&walk, Duration::from_secs(15), Utc::now(), 0.0, &mut rand::rng());
        let noisy = sample_track(&walk, Duration::from_secs(15), Utc::now(), 8.0, &mut rand::rng());

        assert_eq!(exact.len(), noisy.len());
        for (a, b) in exact.iter().zip(&noisy) {
            assert!(haversine_distance(a.lat, a.lon, b.lat, b.lon) <= 8.0 + 1e-6);
            assert_eq!(b.accuracy_m, Some(8.0));
        }
    }
}

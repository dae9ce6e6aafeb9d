//! Walking path implementations.

use hazard_core::spatial::{destination_point, haversine_distance, initial_bearing};
use std::f64::consts::PI;

/// Typical walking pace in m/s.
pub const WALKING_SPEED_MPS: f64 = 1.4;

/// A pedestrian route parameterised by time.
pub trait WalkPath: Send + Sync {
    /// (lat, lon) at `t` seconds from the start of the walk.
    fn position_at(&self, t: f64) -> (f64, f64);

    /// Seconds until the walk is complete.
    fn duration_secs(&self) -> f64;

    fn speed_mps(&self) -> f64;
}

/// Straight great-circle walk between two points.
pub struct LinearWalk {
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    pub speed_mps: f64,
    pub distance_m: f64,
    bearing_rad: f64,
}

impl LinearWalk {
    pub fn new(start_lat: f64, start_lon: f64, end_lat: f64, end_lon: f64, speed_mps: f64) -> Self {
        Self {
            start_lat,
            start_lon,
            end_lat,
            end_lon,
            speed_mps,
            distance_m: haversine_distance(start_lat, start_lon, end_lat, end_lon),
            bearing_rad: initial_bearing(start_lat, start_lon, end_lat, end_lon),
        }
    }

    /// Walk `distance_m` from the start along `bearing_deg` (0 = north).
    pub fn heading(
        start_lat: f64,
        start_lon: f64,
        bearing_deg: f64,
        distance_m: f64,
        speed_mps: f64,
    ) -> Self {
        let (end_lat, end_lon) =
            destination_point(start_lat, start_lon, distance_m, bearing_deg.to_radians());
        Self::new(start_lat, start_lon, end_lat, end_lon, speed_mps)
    }
}

impl WalkPath for LinearWalk {
    fn position_at(&self, t: f64) -> (f64, f64) {
        let travelled = (t.max(0.0) * self.speed_mps).min(self.distance_m);
        destination_point(self.start_lat, self.start_lon, travelled, self.bearing_rad)
    }

    fn duration_secs(&self) -> f64 {
        if self.speed_mps > 0.0 {
            self.distance_m / self.speed_mps
        } else {
            0.0
        }
    }

    fn speed_mps(&self) -> f64 {
        self.speed_mps
    }
}

/// One lap around a block, centred on a point.
pub struct CircularWalk {
    pub center_lat: f64,
    pub center_lon: f64,
    pub radius_m: f64,
    pub speed_mps: f64,
    pub clockwise: bool,
    period: f64,
}

impl CircularWalk {
    pub fn new(center_lat: f64, center_lon: f64, radius_m: f64, speed_mps: f64, clockwise: bool) -> Self {
        let circumference = 2.0 * PI * radius_m;
        let period = if speed_mps > 0.0 {
            circumference / speed_mps
        } else {
            0.0
        };
        Self {
            center_lat,
            center_lon,
            radius_m,
            speed_mps,
            clockwise,
            period,
        }
    }
}

impl WalkPath for CircularWalk {
    fn position_at(&self, t: f64) -> (f64, f64) {
        if self.period <= 0.0 {
            return destination_point(self.center_lat, self.center_lon, self.radius_m, 0.0);
        }
        let mut angle = 2.0 * PI * t.clamp(0.0, self.period) / self.period;
        if self.clockwise {
            angle = -angle;
        }
        destination_point(self.center_lat, self.center_lon, self.radius_m, angle)
    }

    fn duration_secs(&self) -> f64 {
        self.period
    }

    fn speed_mps(&self) -> f64 {
        self.speed_mps
    }
}

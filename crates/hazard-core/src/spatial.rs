//! Great-circle helpers on a spherical Earth.

/// Mean Earth radius used for every distance in the crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance in meters between two WGS84 points (haversine formula).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial bearing from point 1 to point 2, radians clockwise from north.
pub fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    y.atan2(x)
}

/// Destination reached by travelling `distance_m` along `bearing_rad`.
///
/// Returns `(lat, lon)` in degrees with longitude wrapped to [-180, 180).
pub fn destination_point(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();
    let delta = distance_m / EARTH_RADIUS_M;

    let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * bearing_rad.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * delta.sin() * phi1.cos();
    let x = delta.cos() - phi1.sin() * sin_phi2;
    let lambda2 = (lambda1 + y.atan2(x) + std::f64::consts::PI)
        .rem_euclid(2.0 * std::f64::consts::PI)
        - std::f64::consts::PI;

    (phi2.to_degrees(), lambda2.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn one_degree_of_latitude() {
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.9).abs() < 1.0);
    }

    #[test]
    fn same_point_is_zero() {
        let dist = haversine_distance(-16.4090, -71.5375, -16.4090, -71.5375);
        assert!(dist < 1e-6);
    }

    #[test]
    fn destination_round_trips_through_haversine() {
        let (lat, lon) = destination_point(-16.4090, -71.5375, 300.0, FRAC_PI_2);
        let dist = haversine_distance(-16.4090, -71.5375, lat, lon);
        assert!((dist - 300.0).abs() < 1e-6, "got {dist}");

        let bearing = initial_bearing(-16.4090, -71.5375, lat, lon);
        assert!((bearing - FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn destination_wraps_the_antimeridian() {
        let (_, lon) = destination_point(0.0, 179.9995, 200.0, FRAC_PI_2);
        assert!(lon < -179.99);
    }
}

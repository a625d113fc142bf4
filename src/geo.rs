// SPDX-License-Identifier: MIT

//! Great-circle distance between coordinates.

use crate::models::TrackPoint;

/// Mean Earth radius in meters, as used by the original distance code.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance in meters between two track points.
///
/// Deterministic and total for finite latitude/longitude; every distance
/// accumulated by the recording engine goes through this one function.
pub fn distance_meters(a: &TrackPoint, b: &TrackPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(latitude: f64, longitude: f64) -> TrackPoint {
        TrackPoint {
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_zero_distance_for_same_point() {
        let p = point(37.4, -122.1);
        assert_eq!(distance_meters(&p, &p), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let a = point(37.4, -122.1);
        let b = point(37.5, -122.2);
        let ab = distance_meters(&a, &b);
        let ba = distance_meters(&b, &a);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // One degree of latitude is ~111.2 km with R = 6371 km.
        let a = point(0.0, 0.0);
        let b = point(1.0, 0.0);
        let d = distance_meters(&a, &b);
        assert!((d - 111_194.9).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_small_delta_close_to_arc_length() {
        // 0.0009 degrees of latitude is just over 100 m.
        let a = point(0.0, 0.0);
        let b = point(0.0009, 0.0);
        let d = distance_meters(&a, &b);
        assert!((d - 100.075).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_longitude_shrinks_with_latitude() {
        let eq_a = point(0.0, 0.0);
        let eq_b = point(0.0, 0.001);
        let north_a = point(60.0, 0.0);
        let north_b = point(60.0, 0.001);
        let at_equator = distance_meters(&eq_a, &eq_b);
        let at_sixty = distance_meters(&north_a, &north_b);
        // cos(60°) = 0.5
        assert!((at_sixty / at_equator - 0.5).abs() < 1e-3);
    }
}

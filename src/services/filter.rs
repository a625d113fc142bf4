// SPDX-License-Identifier: MIT

//! Sample filter: decides whether a raw fix may enter the route.
//!
//! Pure decision function with no memory; the recording session supplies the
//! last accepted point and acts on the verdict.

use crate::geo;
use crate::models::{LocationFix, TrackPoint};

/// Fixes with a worse horizontal accuracy than this never enter the route.
pub const MAX_ACCURACY_METERS: f64 = 50.0;

/// A point-to-point delta beyond this is treated as a GPS glitch. The point
/// is excluded entirely: neither distance nor route receive it.
pub const MAX_JUMP_METERS: f64 = 100.0;

/// Verdict for one fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterDecision {
    /// Accepted; carries the distance from the last accepted point (0 for
    /// the first point of a session) so the caller does not recompute it.
    Accept { delta_m: f64 },
    RejectLowAccuracy,
    RejectJump,
}

/// Evaluate one fix against the previous accepted point.
pub fn evaluate(fix: &LocationFix, last_accepted: Option<&TrackPoint>) -> FilterDecision {
    if fix.horizontal_accuracy_m > MAX_ACCURACY_METERS {
        return FilterDecision::RejectLowAccuracy;
    }

    match last_accepted {
        None => FilterDecision::Accept { delta_m: 0.0 },
        Some(prev) => {
            let delta_m = geo::distance_meters(prev, &fix.track_point());
            if delta_m > MAX_JUMP_METERS {
                FilterDecision::RejectJump
            } else {
                FilterDecision::Accept { delta_m }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fix(latitude: f64, longitude: f64, accuracy: f64) -> LocationFix {
        LocationFix {
            latitude,
            longitude,
            horizontal_accuracy_m: accuracy,
            speed_mps: 5.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_accuracy_boundary() {
        // 50 is accepted, 51 is rejected.
        assert_eq!(
            evaluate(&fix(0.0, 0.0, 50.0), None),
            FilterDecision::Accept { delta_m: 0.0 }
        );
        assert_eq!(
            evaluate(&fix(0.0, 0.0, 51.0), None),
            FilterDecision::RejectLowAccuracy
        );
    }

    #[test]
    fn test_first_fix_has_zero_delta() {
        match evaluate(&fix(37.0, -122.0, 10.0), None) {
            FilterDecision::Accept { delta_m } => assert_eq!(delta_m, 0.0),
            other => panic!("unexpected decision {:?}", other),
        }
    }

    #[test]
    fn test_jump_boundary() {
        let last = TrackPoint {
            latitude: 0.0,
            longitude: 0.0,
        };
        // ~99.9 m north: accepted.
        let near = fix(0.000899, 0.0, 10.0);
        match evaluate(&near, Some(&last)) {
            FilterDecision::Accept { delta_m } => {
                assert!(delta_m > 99.0 && delta_m <= 100.0, "delta {}", delta_m)
            }
            other => panic!("unexpected decision {:?}", other),
        }
        // ~100.2 m north: a jump.
        let far = fix(0.000901, 0.0, 10.0);
        assert_eq!(evaluate(&far, Some(&last)), FilterDecision::RejectJump);
    }

    #[test]
    fn test_low_accuracy_wins_over_jump() {
        let last = TrackPoint {
            latitude: 0.0,
            longitude: 0.0,
        };
        // Both rules would reject; the accuracy check runs first.
        let bad = fix(1.0, 1.0, 200.0);
        assert_eq!(
            evaluate(&bad, Some(&last)),
            FilterDecision::RejectLowAccuracy
        );
    }
}

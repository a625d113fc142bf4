// SPDX-License-Identifier: MIT

//! Location fixes and track points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw GPS reading from the location provider.
///
/// Ephemeral: fixes are consumed by the sample filter and never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters (lower is better).
    pub horizontal_accuracy_m: f64,
    /// Instantaneous speed reported by the provider, in m/s.
    pub speed_mps: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    /// Instantaneous speed in km/h.
    pub fn speed_kmh(&self) -> f64 {
        self.speed_mps * 3.6
    }

    /// Projection onto the stored route representation.
    pub fn track_point(&self) -> TrackPoint {
        TrackPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// A coordinate accepted into a session's route. Append-only while recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// What the platform location adapter reports before a session may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationAvailability {
    Available,
    PermissionDenied,
    Unavailable,
}

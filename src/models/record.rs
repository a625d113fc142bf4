// SPDX-License-Identifier: MIT

//! Finalized ride records and their wire representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TrackPoint;
use crate::time_utils::format_utc_rfc3339;

/// The output of a stopped recording session, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Wall time minus accumulated paused time.
    pub duration_ms: u64,
    pub distance_m: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    /// Estimate from distance and rider weight; see `RecordingSession::stop_at`.
    pub calories: u32,
    pub route: Vec<TrackPoint>,
}

/// A persisted ride record. Immutable once created; deleted only explicitly
/// by the user (which also removes the derived thumbnail artifact).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Id assigned by the local store.
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub distance_m: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub calories: u32,
    pub route: Vec<TrackPoint>,
    /// Path of the rendered route thumbnail, if rendering succeeded.
    pub thumbnail_path: Option<String>,
}

/// Wire model for pushing a ride record to the remote service
/// (`POST /api/rides`). Field names and shapes match the server's DTOs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideUpload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: i64,
    pub distance_meters: f64,
    pub average_speed_kmh: f64,
    pub track_points: Vec<TrackPointUpload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One route point on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPointUpload {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

impl RideUpload {
    /// Build the upload payload for a finalized record.
    pub fn from_record(record: &ActivityRecord) -> Self {
        let timestamp = format_utc_rfc3339(record.end_time);
        Self {
            id: None,
            start_time: format_utc_rfc3339(record.start_time),
            end_time: format_utc_rfc3339(record.end_time),
            duration_seconds: (record.duration_ms / 1000) as i64,
            distance_meters: record.distance_m,
            average_speed_kmh: record.avg_speed_kmh,
            track_points: record
                .route
                .iter()
                .map(|p| TrackPointUpload {
                    latitude: p.latitude,
                    longitude: p.longitude,
                    timestamp: timestamp.clone(),
                    speed: None,
                    altitude: None,
                })
                .collect(),
            title: Some(format!(
                "Ride - {}",
                record.start_time.format("%Y-%m-%d %H:%M")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_upload_payload_shape() {
        let record = ActivityRecord {
            id: 7,
            start_time: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap(),
            duration_ms: 1_800_000,
            distance_m: 5_000.0,
            avg_speed_kmh: 10.0,
            max_speed_kmh: 24.5,
            calories: 175,
            route: vec![
                TrackPoint {
                    latitude: 0.0,
                    longitude: 0.0,
                },
                TrackPoint {
                    latitude: 0.001,
                    longitude: 0.0,
                },
            ],
            thumbnail_path: None,
        };

        let upload = RideUpload::from_record(&record);
        assert_eq!(upload.duration_seconds, 1800);
        assert_eq!(upload.track_points.len(), 2);
        assert_eq!(upload.start_time, "2025-06-01T08:00:00Z");

        let json = serde_json::to_value(&upload).unwrap();
        assert!(json.get("durationSeconds").is_some());
        assert!(json.get("averageSpeedKmh").is_some());
        assert!(json.get("trackPoints").is_some());
        // Local id never leaks to the server.
        assert!(json.get("id").is_none());
    }
}

// SPDX-License-Identifier: MIT

//! The recording session state machine.
//!
//! `RecordingSession` is a pure accumulator: every transition takes the
//! current time as an argument, so the machine is fully deterministic under
//! test. The async side (channel consumption, the wall clock, persistence)
//! lives in [`crate::services::recorder`], which owns the single live
//! instance and serializes all mutation through one loop.

use chrono::{DateTime, Utc};

use crate::models::{LocationFix, SessionSummary, TrackPoint};
use crate::services::filter::{self, FilterDecision};

/// Session lifecycle. `Stopped` is terminal; a new ride needs a new instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Recording,
    Paused,
    Stopped,
}

/// What happened to one delivered fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// Appended to the route; `delta_m` was added to the total distance.
    Accepted { delta_m: f64 },
    RejectedLowAccuracy,
    RejectedJump,
    /// Dropped because the session was not in the Recording state.
    Ignored,
}

/// Result of stopping a session.
#[derive(Debug, Clone)]
pub enum StopOutcome {
    Saved(SessionSummary),
    /// Fewer than two route points: nothing worth keeping.
    TooFewPoints,
}

/// One in-progress ride. Exactly one instance is live per device; the
/// recorder enforces that precondition at start.
#[derive(Debug)]
pub struct RecordingSession {
    state: SessionState,
    start_time: DateTime<Utc>,
    paused_at: Option<DateTime<Utc>>,
    accumulated_paused_ms: u64,
    route: Vec<TrackPoint>,
    total_distance_m: f64,
    max_speed_kmh: f64,
    speed_samples: Vec<f64>,
    last_accepted: Option<TrackPoint>,
    rejected_low_accuracy: u64,
    rejected_jump: u64,
    ignored: u64,
    rider_weight_kg: f64,
}

impl RecordingSession {
    /// Begin recording at `start_time` with all accumulators reset.
    pub fn new(start_time: DateTime<Utc>, rider_weight_kg: f64) -> Self {
        Self {
            state: SessionState::Recording,
            start_time,
            paused_at: None,
            accumulated_paused_ms: 0,
            route: Vec::new(),
            total_distance_m: 0.0,
            max_speed_kmh: 0.0,
            speed_samples: Vec::new(),
            last_accepted: None,
            rejected_low_accuracy: 0,
            rejected_jump: 0,
            ignored: 0,
            rider_weight_kg,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn route(&self) -> &[TrackPoint] {
        &self.route
    }

    /// Monotonically non-decreasing while Recording, frozen while Paused.
    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    pub fn max_speed_kmh(&self) -> f64 {
        self.max_speed_kmh
    }

    /// Running average of the positive speed samples, for live display.
    pub fn live_avg_speed_kmh(&self) -> f64 {
        if self.speed_samples.is_empty() {
            0.0
        } else {
            self.speed_samples.iter().sum::<f64>() / self.speed_samples.len() as f64
        }
    }

    /// (low-accuracy, jump, ignored-while-not-recording) rejection counters.
    pub fn rejection_counts(&self) -> (u64, u64, u64) {
        (self.rejected_low_accuracy, self.rejected_jump, self.ignored)
    }

    /// Total paused wall time accumulated so far. While paused, the open
    /// pause window is not included until resume closes it.
    pub fn accumulated_paused_ms(&self) -> u64 {
        self.accumulated_paused_ms
    }

    /// Start of the open pause window, if currently paused.
    pub fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
    }

    /// Elapsed active time at `now`: wall time minus paused time. Frozen
    /// while paused. This is what the 1 Hz readout displays; it reads state
    /// and never mutates it.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let reference = match (self.state, self.paused_at) {
            (SessionState::Paused, Some(paused_at)) => paused_at,
            _ => now,
        };
        millis_between(self.start_time, reference).saturating_sub(self.accumulated_paused_ms)
    }

    /// Feed one fix through the sample filter and into the accumulators.
    ///
    /// Only meaningful while Recording; fixes delivered in any other state
    /// are dropped (the provider may keep pushing for camera-follow purposes,
    /// but those fixes must not mutate distance, speed, or route).
    pub fn on_fix(&mut self, fix: &LocationFix) -> FixOutcome {
        if self.state != SessionState::Recording {
            self.ignored += 1;
            return FixOutcome::Ignored;
        }

        match filter::evaluate(fix, self.last_accepted.as_ref()) {
            FilterDecision::RejectLowAccuracy => {
                self.rejected_low_accuracy += 1;
                FixOutcome::RejectedLowAccuracy
            }
            FilterDecision::RejectJump => {
                self.rejected_jump += 1;
                FixOutcome::RejectedJump
            }
            FilterDecision::Accept { delta_m } => {
                let point = fix.track_point();
                self.route.push(point);
                self.last_accepted = Some(point);
                self.total_distance_m += delta_m;

                let speed_kmh = fix.speed_kmh();
                if speed_kmh > 0.0 {
                    self.speed_samples.push(speed_kmh);
                    if speed_kmh > self.max_speed_kmh {
                        self.max_speed_kmh = speed_kmh;
                    }
                }
                FixOutcome::Accepted { delta_m }
            }
        }
    }

    /// Recording → Paused. Returns false if the session was not recording.
    pub fn pause_at(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }
        self.state = SessionState::Paused;
        self.paused_at = Some(now);
        true
    }

    /// Paused → Recording. Adds the closed pause window to the accumulator.
    pub fn resume_at(&mut self, now: DateTime<Utc>) -> bool {
        let Some(paused_at) = self.paused_at else {
            return false;
        };
        if self.state != SessionState::Paused {
            return false;
        }
        self.accumulated_paused_ms += millis_between(paused_at, now);
        self.paused_at = None;
        self.state = SessionState::Recording;
        true
    }

    /// Stop the session and compute the final summary.
    ///
    /// Consumes the machine: `Stopped` is terminal. A session with fewer
    /// than two route points is discarded rather than saved.
    pub fn stop_at(mut self, now: DateTime<Utc>) -> StopOutcome {
        // Close an open pause window so paused time is not counted as riding.
        if let Some(paused_at) = self.paused_at.take() {
            self.accumulated_paused_ms += millis_between(paused_at, now);
        }
        self.state = SessionState::Stopped;

        if self.route.len() < 2 {
            return StopOutcome::TooFewPoints;
        }

        let duration_ms =
            millis_between(self.start_time, now).saturating_sub(self.accumulated_paused_ms);

        let avg_speed_kmh = if duration_ms > 0 {
            (self.total_distance_m / 1000.0) / (duration_ms as f64 / 3_600_000.0)
        } else {
            0.0
        };

        // Flat estimate from the original app: km x weight x 0.5.
        let calories = ((self.total_distance_m / 1000.0) * self.rider_weight_kg * 0.5) as u32;

        StopOutcome::Saved(SessionSummary {
            start_time: self.start_time,
            end_time: now,
            duration_ms,
            distance_m: self.total_distance_m,
            avg_speed_kmh,
            max_speed_kmh: self.max_speed_kmh,
            calories,
            route: self.route,
        })
    }
}

fn millis_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> u64 {
    (later - earlier).num_milliseconds().max(0) as u64
}

// SPDX-License-Identifier: MIT

//! The async recording controller.
//!
//! Owns the single live [`RecordingSession`] and serializes every mutation
//! through one consumer loop: location fixes arrive on a bounded channel
//! from the provider adapter, control commands (pause/resume/stop/discard)
//! on a second channel into the same `select!`. Observers read a `watch`
//! snapshot; the 1 Hz elapsed ticker is one such reader and never mutates
//! session state.
//!
//! Finalize persistence and the remote push run after the loop has decided
//! to stop, so they can never delay a location callback; the push itself is
//! fire-and-forget.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::models::{ActivityRecord, LocationAvailability, LocationFix};
use crate::services::records::ActivityRecordStore;
use crate::services::session::{FixOutcome, RecordingSession, SessionState, StopOutcome};
use crate::services::sync::SyncGateway;
use crate::time_utils::format_duration_hms;

/// Result of stopping a session, surfaced to the caller as a value.
#[derive(Debug)]
pub enum RideOutcome {
    Saved(ActivityRecord),
    /// Too few track points; nothing was persisted.
    TooFewPoints,
}

/// Read-only snapshot of the live session, published on every change.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub state: SessionState,
    pub start_time: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub accumulated_paused_ms: u64,
    pub distance_m: f64,
    pub max_speed_kmh: f64,
    pub live_avg_speed_kmh: f64,
    pub route_len: usize,
    pub rejected_low_accuracy: u64,
    pub rejected_jump: u64,
}

impl SessionStatus {
    /// Elapsed active time at `now`; frozen while paused.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let reference = match (self.state, self.paused_at) {
            (SessionState::Paused, Some(paused_at)) => paused_at,
            _ => now,
        };
        ((reference - self.start_time).num_milliseconds().max(0) as u64)
            .saturating_sub(self.accumulated_paused_ms)
    }

    fn of(session: &RecordingSession) -> Self {
        let (rejected_low_accuracy, rejected_jump, _) = session.rejection_counts();
        Self {
            state: session.state(),
            start_time: session.start_time(),
            paused_at: session.paused_at(),
            accumulated_paused_ms: session.accumulated_paused_ms(),
            distance_m: session.total_distance_m(),
            max_speed_kmh: session.max_speed_kmh(),
            live_avg_speed_kmh: session.live_avg_speed_kmh(),
            route_len: session.route().len(),
            rejected_low_accuracy,
            rejected_jump,
        }
    }
}

enum Command {
    Pause,
    Resume,
    Stop(oneshot::Sender<Result<RideOutcome>>),
    Discard(oneshot::Sender<()>),
}

/// Controller for recording sessions. At most one session is live at a time;
/// a second `start` while one is active is rejected, never a silent replace.
pub struct Recorder {
    rider_weight_kg: f64,
    records: ActivityRecordStore,
    sync: SyncGateway,
    active: Arc<AtomicBool>,
}

impl Recorder {
    pub fn new(config: &Config, records: ActivityRecordStore, sync: SyncGateway) -> Self {
        Self {
            rider_weight_kg: config.rider_weight_kg,
            records,
            sync,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a session is currently live.
    pub fn is_recording(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a new session consuming fixes from `fixes`.
    ///
    /// `availability` comes from the platform location adapter; anything but
    /// `Available` refuses the start. `access_token`, when present, is used
    /// for the best-effort upload after the session finalizes.
    pub fn start(
        &self,
        availability: LocationAvailability,
        fixes: mpsc::Receiver<LocationFix>,
        access_token: Option<String>,
    ) -> Result<SessionHandle> {
        match availability {
            LocationAvailability::Available => {}
            LocationAvailability::PermissionDenied => return Err(CoreError::PermissionDenied),
            LocationAvailability::Unavailable => return Err(CoreError::LocationUnavailable),
        }

        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CoreError::AlreadyRecording);
        }

        let session = RecordingSession::new(Utc::now(), self.rider_weight_kg);
        tracing::info!(start_time = %session.start_time(), "Recording session started");

        let (command_tx, command_rx) = mpsc::channel(8);
        let (status_tx, status_rx) = watch::channel(SessionStatus::of(&session));

        tokio::spawn(session_loop(
            session,
            fixes,
            command_rx,
            status_tx,
            self.records.clone(),
            self.sync.clone(),
            access_token,
            Arc::clone(&self.active),
        ));

        Ok(SessionHandle {
            commands: command_tx,
            status: status_rx,
        })
    }
}

/// Caller-side handle to the live session.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    /// Latest published snapshot.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Elapsed active time right now.
    pub fn elapsed_ms(&self) -> u64 {
        self.status().elapsed_ms(Utc::now())
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.send(Command::Resume).await
    }

    /// Stop and finalize. Consumes the handle: the session is terminal.
    pub async fn stop(self) -> Result<RideOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Stop(reply_tx))
            .await
            .map_err(|_| CoreError::SessionClosed)?;
        reply_rx.await.map_err(|_| CoreError::SessionClosed)?
    }

    /// Drop the session without persisting anything.
    pub async fn discard(self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Discard(reply_tx))
            .await
            .map_err(|_| CoreError::SessionClosed)?;
        reply_rx.await.map_err(|_| CoreError::SessionClosed)
    }

    /// Independent view of the status snapshots, e.g. for the elapsed
    /// ticker or a map overlay.
    pub fn status_stream(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::SessionClosed)
    }
}

/// Drive a 1 Hz elapsed-time readout until the session ends, feeding the
/// formatted `HH:MM:SS` value to `on_tick`.
///
/// This is the display side of the elapsed clock: it only ever *reads* the
/// published snapshot, so it can never race the recording loop. The readout
/// does not advance while the session is paused.
pub async fn run_elapsed_ticker<F>(status: watch::Receiver<SessionStatus>, mut on_tick: F)
where
    F: FnMut(String),
{
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
    loop {
        interval.tick().await;
        if status.has_changed().is_err() {
            // Session loop is gone.
            break;
        }
        let snapshot = status.borrow().clone();
        if snapshot.state == SessionState::Stopped {
            break;
        }
        on_tick(format_duration_hms(snapshot.elapsed_ms(Utc::now())));
    }
}

#[allow(clippy::too_many_arguments)]
async fn session_loop(
    mut session: RecordingSession,
    mut fixes: mpsc::Receiver<LocationFix>,
    mut commands: mpsc::Receiver<Command>,
    status_tx: watch::Sender<SessionStatus>,
    records: ActivityRecordStore,
    sync: SyncGateway,
    access_token: Option<String>,
    active: Arc<AtomicBool>,
) {
    let mut fixes_open = true;
    loop {
        tokio::select! {
            maybe_fix = fixes.recv(), if fixes_open => {
                match maybe_fix {
                    Some(fix) => {
                        let outcome = session.on_fix(&fix);
                        match outcome {
                            FixOutcome::Accepted { delta_m } => tracing::debug!(
                                delta_m,
                                total_m = session.total_distance_m(),
                                points = session.route().len(),
                                "Fix accepted"
                            ),
                            FixOutcome::RejectedLowAccuracy => tracing::debug!(
                                accuracy = fix.horizontal_accuracy_m,
                                "Fix rejected: low accuracy"
                            ),
                            FixOutcome::RejectedJump => {
                                tracing::debug!("Fix rejected: implausible jump")
                            }
                            FixOutcome::Ignored => tracing::trace!("Fix ignored while paused"),
                        }
                        let _ = status_tx.send(SessionStatus::of(&session));
                    }
                    None => {
                        tracing::warn!("Location provider channel closed");
                        fixes_open = false;
                    }
                }
            }
            maybe_command = commands.recv() => {
                match maybe_command {
                    Some(Command::Pause) => {
                        if session.pause_at(Utc::now()) {
                            tracing::info!("Session paused");
                        }
                        let _ = status_tx.send(SessionStatus::of(&session));
                    }
                    Some(Command::Resume) => {
                        if session.resume_at(Utc::now()) {
                            tracing::info!(
                                paused_ms = session.accumulated_paused_ms(),
                                "Session resumed"
                            );
                        }
                        let _ = status_tx.send(SessionStatus::of(&session));
                    }
                    Some(Command::Stop(reply)) => {
                        let result = finalize(
                            session,
                            &status_tx,
                            &records,
                            &sync,
                            access_token.as_deref(),
                        )
                        .await;
                        let _ = reply.send(result);
                        break;
                    }
                    Some(Command::Discard(reply)) => {
                        tracing::info!(
                            points = session.route().len(),
                            "Session discarded"
                        );
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        // Handle dropped without stop(): treat as discard.
                        tracing::warn!("Session handle dropped; discarding session");
                        break;
                    }
                }
            }
        }
    }
    active.store(false, Ordering::SeqCst);
}

/// Stop the machine, persist the record, and kick off the best-effort push.
async fn finalize(
    session: RecordingSession,
    status_tx: &watch::Sender<SessionStatus>,
    records: &ActivityRecordStore,
    sync: &SyncGateway,
    access_token: Option<&str>,
) -> Result<RideOutcome> {
    match session.stop_at(Utc::now()) {
        StopOutcome::TooFewPoints => {
            tracing::info!("Session stopped with too few points; not saved");
            Ok(RideOutcome::TooFewPoints)
        }
        StopOutcome::Saved(summary) => {
            let record = records.finalize(summary).await?;
            let mut stopped = SessionStatus {
                state: SessionState::Stopped,
                ..status_tx.borrow().clone()
            };
            stopped.distance_m = record.distance_m;
            stopped.route_len = record.route.len();
            let _ = status_tx.send(stopped);

            if let Some(token) = access_token {
                let sync = sync.clone();
                let token = token.to_string();
                let upload = record.clone();
                tokio::spawn(async move {
                    // Local persistence already succeeded; a failed push is
                    // logged and swallowed, the local record stays
                    // authoritative.
                    if let Err(err) = sync.push_ride(&token, &upload).await {
                        tracing::warn!(record_id = upload.id, error = %err, "Ride upload failed");
                    } else {
                        tracing::info!(record_id = upload.id, "Ride uploaded");
                    }
                });
            }
            Ok(RideOutcome::Saved(record))
        }
    }
}

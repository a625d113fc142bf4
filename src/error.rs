// SPDX-License-Identifier: MIT

//! Crate error taxonomy.
//!
//! Failures that only affect one operation's freshness (remote sync, remote
//! fetch, thumbnail rendering) are absorbed at the call site and logged;
//! failures that make an operation meaningless (starting without location
//! access, stopping with too few points) are surfaced as explicit outcomes.
//! Nothing here is fatal to the process.

/// Error type covering the recording engine and the sync/cache layer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location provider unavailable")]
    LocationUnavailable,

    #[error("A recording session is already active")]
    AlreadyRecording,

    #[error("Thumbnail rendering failed: {0}")]
    ThumbnailRender(String),

    #[error("Remote push failed: {0}")]
    RemotePush(String),

    #[error("Remote fetch failed: {0}")]
    RemoteFetch(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Session is no longer running")]
    SessionClosed,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.to_string())
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;

// SPDX-License-Identifier: MIT

//! Services module - the recording engine and the sync/cache layer.

pub mod cache;
pub mod filter;
pub mod recorder;
pub mod records;
pub mod session;
pub mod sync;
pub mod thumbnail;

pub use cache::{CacheEntity, ReadThroughCache, RemoteCollection};
pub use filter::FilterDecision;
pub use recorder::{run_elapsed_ticker, Recorder, RideOutcome, SessionHandle, SessionStatus};
pub use records::ActivityRecordStore;
pub use session::{FixOutcome, RecordingSession, SessionState, StopOutcome};
pub use sync::SyncGateway;
pub use thumbnail::ThumbnailRenderer;

// SPDX-License-Identifier: MIT

//! Finalized ride record store.
//!
//! Turns a stopped session into an immutable [`ActivityRecord`]: renders the
//! route thumbnail (best effort), writes the record to the local store, and
//! serves reads and deletes. Records are never mutated after creation.

use std::path::Path;

use crate::db::LocalStore;
use crate::error::Result;
use crate::models::{ActivityRecord, SessionSummary};
use crate::services::thumbnail::ThumbnailRenderer;

#[derive(Clone)]
pub struct ActivityRecordStore {
    store: LocalStore,
    renderer: ThumbnailRenderer,
}

impl ActivityRecordStore {
    pub fn new(store: LocalStore, renderer: ThumbnailRenderer) -> Self {
        Self { store, renderer }
    }

    /// Persist a finalized session and return the stored record.
    ///
    /// Thumbnail rendering runs on the blocking pool and its failure only
    /// costs the thumbnail, never the record.
    pub async fn finalize(&self, summary: SessionSummary) -> Result<ActivityRecord> {
        let renderer = self.renderer.clone();
        let route = summary.route.clone();
        let thumbnail_path =
            match tokio::task::spawn_blocking(move || renderer.render(&route)).await {
                Ok(Ok(path)) => Some(path.to_string_lossy().into_owned()),
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "Thumbnail rendering failed; saving without one");
                    None
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Thumbnail task panicked; saving without one");
                    None
                }
            };

        let record = self.store.insert_record(summary, thumbnail_path).await?;
        tracing::info!(
            record_id = record.id,
            distance_m = record.distance_m,
            duration_ms = record.duration_ms,
            "Ride record saved"
        );
        Ok(record)
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<ActivityRecord>> {
        self.store.list_records().await
    }

    pub async fn get(&self, id: i64) -> Result<Option<ActivityRecord>> {
        self.store.get_record(id).await
    }

    /// Delete a record and its thumbnail artifact. Returns whether a record
    /// existed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        match self.store.delete_record(id).await? {
            Some(record) => {
                if let Some(path) = &record.thumbnail_path {
                    ThumbnailRenderer::delete(Path::new(path));
                }
                tracing::info!(record_id = id, "Ride record deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

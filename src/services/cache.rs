// SPDX-License-Identifier: MIT

//! Generic read-through cache for list screens.
//!
//! Every list-backed entity type (posts, comments, likes, forum categories,
//! topics, replies) goes through the same two operations:
//!
//! - `load`: fetch the remote list, merge it into the local partition
//!   (upsert by id), and return the fresh list; if the remote fails, serve
//!   the local partition instead and never surface the failure.
//! - `write`: persist locally first (optimistic), then push; on success
//!   reconcile server-assigned fields back into the local copy, on failure
//!   keep the optimistic copy.
//!
//! Items written before they ever reach the server get a locally assigned
//! *negative* id, which cannot collide with server ids and marks the row as
//! never-synced. Writes to the same id are serialized through a per-id lock.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::db::{origin, LocalStore};
use crate::error::{CoreError, Result};

/// A list-item type that can live in a cache partition.
pub trait CacheEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Partition name in the local store.
    const KIND: &'static str;

    fn id(&self) -> Option<i64>;
    fn set_id(&mut self, id: i64);
}

/// The remote side of one cached collection. Implementations carry their own
/// credential and any path parameters (see [`crate::services::sync`]).
pub trait RemoteCollection<T>: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Vec<T>>> + Send;
    fn push(&self, item: &T) -> impl Future<Output = Result<T>> + Send;
}

/// Read-through cache over one entity type.
pub struct ReadThroughCache<T, R> {
    remote: R,
    store: LocalStore,
    write_locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, R> ReadThroughCache<T, R>
where
    T: CacheEntity,
    R: RemoteCollection<T>,
{
    pub fn new(remote: R, store: LocalStore) -> Self {
        Self {
            remote,
            store,
            write_locks: Arc::new(DashMap::new()),
            _entity: PhantomData,
        }
    }

    /// Remote-first read with local fallback. Safe to call repeatedly and
    /// concurrently; merging is upsert-by-id, so repeated identical loads
    /// are idempotent.
    pub async fn load(&self) -> Result<Vec<T>> {
        match self.remote.fetch().await {
            Ok(items) => {
                let now = Utc::now();
                for item in &items {
                    let Some(id) = item.id() else {
                        tracing::warn!(kind = T::KIND, "Remote item without id; not cached");
                        continue;
                    };
                    self.store
                        .upsert_cached(T::KIND, id, to_payload(item)?, origin::REMOTE, Some(now))
                        .await?;
                }
                tracing::debug!(kind = T::KIND, count = items.len(), "Remote list cached");
                Ok(items)
            }
            Err(err) => {
                tracing::warn!(
                    kind = T::KIND,
                    error = %err,
                    "Remote fetch failed; serving local cache"
                );
                self.read_local().await
            }
        }
    }

    /// Current local partition contents, without touching the network.
    pub async fn read_local(&self) -> Result<Vec<T>> {
        let rows = self.store.read_cached(T::KIND).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str(&row.payload) {
                Ok(item) => items.push(item),
                Err(err) => {
                    tracing::warn!(
                        kind = T::KIND,
                        id = row.id,
                        error = %err,
                        "Dropping corrupt cached row"
                    );
                }
            }
        }
        Ok(items)
    }

    /// Optimistic write: local copy first, then a best-effort push.
    pub async fn write(&self, mut item: T) -> Result<T> {
        // A brand-new item is allocated its negative local id and inserted in
        // one store operation, so concurrent writers cannot be handed the
        // same id.
        let (local_id, freshly_inserted) = match item.id() {
            Some(id) => (id, false),
            None => {
                let mut draft = item.clone();
                let id = self
                    .store
                    .insert_new_cached(T::KIND, move |id| {
                        draft.set_id(id);
                        to_payload(&draft)
                    })
                    .await?;
                item.set_id(id);
                (id, true)
            }
        };

        // Serialize concurrent writes to the same item. The map guard must
        // not be held across an await.
        let lock = {
            let entry = self.write_locks.entry(local_id).or_default();
            Arc::clone(entry.value())
        };
        let outcome = {
            let _guard = lock.lock().await;
            self.write_under_lock(local_id, freshly_inserted, item).await
        };
        drop(lock);
        // The map keeps the only reference left unless another writer is
        // waiting on the same id.
        self.write_locks
            .remove_if(&local_id, |_, held| Arc::strong_count(held) == 1);
        outcome
    }

    async fn write_under_lock(&self, local_id: i64, freshly_inserted: bool, item: T) -> Result<T> {
        if !freshly_inserted {
            self.store
                .upsert_cached(T::KIND, local_id, to_payload(&item)?, origin::LOCAL, None)
                .await?;
        }

        match self.remote.push(&item).await {
            Ok(server_item) => {
                let now = Utc::now();
                let server_id = server_item.id().unwrap_or(local_id);
                let payload = to_payload(&server_item)?;
                if server_id != local_id {
                    self.store
                        .rekey_cached(T::KIND, local_id, server_id, payload, now)
                        .await?;
                } else {
                    self.store
                        .upsert_cached(T::KIND, server_id, payload, origin::REMOTE, Some(now))
                        .await?;
                }
                Ok(server_item)
            }
            Err(err) => {
                tracing::warn!(
                    kind = T::KIND,
                    id = local_id,
                    error = %err,
                    "Remote push failed; keeping optimistic local copy"
                );
                Ok(item)
            }
        }
    }

    /// Remove one item from the local partition (user-initiated delete).
    pub async fn remove_local(&self, id: i64) -> Result<()> {
        self.store.delete_cached(T::KIND, id).await
    }
}

fn to_payload<T: Serialize>(item: &T) -> Result<String> {
    serde_json::to_string(item).map_err(|e| CoreError::Database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Post;

    /// Remote that always fails, as if the device were offline.
    struct OfflineRemote;

    impl RemoteCollection<Post> for OfflineRemote {
        async fn fetch(&self) -> Result<Vec<Post>> {
            Err(CoreError::RemoteFetch("offline".into()))
        }

        async fn push(&self, _item: &Post) -> Result<Post> {
            Err(CoreError::RemotePush("offline".into()))
        }
    }

    fn draft_post() -> Post {
        Post {
            id: None,
            user_id: 1,
            ride_record_id: None,
            content: Some("draft".into()),
            media_urls: Vec::new(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_write_lock_entries_are_pruned() {
        let store = LocalStore::open_in_memory().unwrap();
        let cache = ReadThroughCache::new(OfflineRemote, store);

        for _ in 0..3 {
            cache.write(draft_post()).await.unwrap();
        }

        // No writer is in flight, so the lock table must not retain entries.
        assert!(cache.write_locks.is_empty());
    }
}

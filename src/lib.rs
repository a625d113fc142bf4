// SPDX-License-Identifier: MIT

//! Veloride: the core of a map-based cycling app.
//!
//! Two subsystems:
//!
//! - the **recording engine**, which turns the asynchronous stream of noisy
//!   GPS fixes into a finalized ride record (distance, duration, speed,
//!   calories) across start / pause / resume / stop, and
//! - the **read-through cache**, the offline-tolerant read/write layer every
//!   list screen (posts, comments, likes, forum) shares.
//!
//! Screens, map rendering, and the authentication flow live outside this
//! crate; they feed fixes in, hand bearer tokens to the sync gateway, and
//! render what comes back.

pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod models;
pub mod services;
pub mod time_utils;

use std::path::PathBuf;

use config::Config;
use db::LocalStore;
use services::{ActivityRecordStore, Recorder, SyncGateway, ThumbnailRenderer};

pub use error::{CoreError, Result};

/// Everything wired together: the handle the app shell keeps for its
/// lifetime.
pub struct Engine {
    pub config: Config,
    pub store: LocalStore,
    pub records: ActivityRecordStore,
    pub sync: SyncGateway,
    pub recorder: Recorder,
}

impl Engine {
    /// Build the engine from configuration, opening the local store.
    pub fn new(config: Config) -> Result<Self> {
        let store = LocalStore::open(&config.db_path)?;
        Self::with_store(config, store)
    }

    /// Build the engine on an existing store (tests use an in-memory one).
    pub fn with_store(config: Config, store: LocalStore) -> Result<Self> {
        let renderer = ThumbnailRenderer::new(
            PathBuf::from(&config.data_dir),
            config.thumbnail_size,
        );
        let records = ActivityRecordStore::new(store.clone(), renderer);
        let sync = SyncGateway::new(config.remote_base_url.clone());
        let recorder = Recorder::new(&config, records.clone(), sync.clone());
        Ok(Self {
            config,
            store,
            records,
            sync,
            recorder,
        })
    }
}

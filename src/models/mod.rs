// SPDX-License-Identifier: MIT

//! Data models for the recording engine and the community cache.

pub mod community;
pub mod location;
pub mod record;

pub use community::{Comment, ForumCategory, ForumReply, ForumTopic, Post, PostLike};
pub use location::{LocationAvailability, LocationFix, TrackPoint};
pub use record::{ActivityRecord, RideUpload, SessionSummary, TrackPointUpload};

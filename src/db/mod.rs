// SPDX-License-Identifier: MIT

//! Local persistence layer (SQLite).

pub mod sqlite;

pub use sqlite::{CachedRow, LocalStore};

/// Origin tags for cached rows.
pub mod origin {
    /// Row last written by a successful remote fetch or reconciled push.
    pub const REMOTE: &str = "remote";
    /// Row last written by an optimistic local write.
    pub const LOCAL: &str = "local";
}

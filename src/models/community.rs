// SPDX-License-Identifier: MIT

//! Community content models: timeline posts, comments, likes, and the forum.
//!
//! These are the list-item types every social screen renders. Shapes mirror
//! the remote service's JSON; each implements [`CacheEntity`] so the screens
//! all share the one read-through cache.

use serde::{Deserialize, Serialize};

use crate::services::cache::CacheEntity;

/// A timeline post, optionally attached to a ride record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub id: Option<i64>,
    pub user_id: i64,
    #[serde(default)]
    pub ride_record_id: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: Option<i64>,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A like on a post. The remote service keys likes by (post, user); locally
/// they still get an id so the cache can upsert them like everything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostLike {
    #[serde(default)]
    pub id: Option<i64>,
    pub post_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A forum category (top level of the forum hierarchy).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumCategory {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topic_count: i64,
}

/// A discussion topic inside a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumTopic {
    #[serde(default)]
    pub id: Option<i64>,
    pub category_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A reply to a forum topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumReply {
    #[serde(default)]
    pub id: Option<i64>,
    pub topic_id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

macro_rules! impl_cache_entity {
    ($ty:ty, $kind:literal) => {
        impl CacheEntity for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> Option<i64> {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = Some(id);
            }
        }
    };
}

impl_cache_entity!(Post, "posts");
impl_cache_entity!(Comment, "comments");
impl_cache_entity!(PostLike, "likes");
impl_cache_entity!(ForumCategory, "forum_categories");
impl_cache_entity!(ForumTopic, "forum_topics");
impl_cache_entity!(ForumReply, "forum_replies");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_deserializes_from_server_json() {
        let json = r#"{
            "id": 12,
            "userId": 3,
            "rideRecordId": null,
            "content": "great loop today",
            "createdAt": "2025-06-01T08:00:00Z"
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, Some(12));
        assert_eq!(post.user_id, 3);
        assert!(post.media_urls.is_empty());
    }

    #[test]
    fn test_entity_kinds_are_distinct() {
        let kinds = [
            Post::KIND,
            Comment::KIND,
            PostLike::KIND,
            ForumCategory::KIND,
            ForumTopic::KIND,
            ForumReply::KIND,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in kinds.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}

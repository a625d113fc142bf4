// SPDX-License-Identifier: MIT

//! Remote sync gateway.
//!
//! HTTP client for the remote service. Pushes are always best effort and
//! always happen *after* local persistence; a failed push leaves the local
//! copy authoritative. The bearer credential is attached by the caller when
//! it builds a typed remote handle; the gateway never stores or refreshes
//! tokens itself. There is no retry queue; a failure is logged by the caller
//! and the next explicit sync attempt starts fresh.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::models::{
    ActivityRecord, Comment, ForumCategory, ForumReply, ForumTopic, Post, PostLike, RideUpload,
};
use crate::services::cache::RemoteCollection;

/// Client for the remote REST service.
#[derive(Clone)]
pub struct SyncGateway {
    http: reqwest::Client,
    base_url: String,
}

impl SyncGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Push a finalized ride record (`POST /api/rides`).
    pub async fn push_ride(&self, access_token: &str, record: &ActivityRecord) -> Result<RideUpload> {
        let upload = RideUpload::from_record(record);
        self.post_json("/api/rides", access_token, &upload).await
    }

    /// Typed remote for timeline posts.
    pub fn posts(&self, access_token: &str) -> PostsRemote {
        PostsRemote {
            gateway: self.clone(),
            token: access_token.to_string(),
        }
    }

    /// Typed remote for the comments of one post.
    pub fn comments(&self, access_token: &str, post_id: i64) -> CommentsRemote {
        CommentsRemote {
            gateway: self.clone(),
            token: access_token.to_string(),
            post_id,
        }
    }

    /// Typed remote for the likes of one post.
    pub fn likes(&self, access_token: &str, post_id: i64) -> LikesRemote {
        LikesRemote {
            gateway: self.clone(),
            token: access_token.to_string(),
            post_id,
        }
    }

    /// Typed remote for forum categories (read-only on the server).
    pub fn forum_categories(&self, access_token: &str) -> CategoriesRemote {
        CategoriesRemote {
            gateway: self.clone(),
            token: access_token.to_string(),
        }
    }

    /// Typed remote for the topics of one category.
    pub fn forum_topics(&self, access_token: &str, category_id: i64) -> TopicsRemote {
        TopicsRemote {
            gateway: self.clone(),
            token: access_token.to_string(),
            category_id,
        }
    }

    /// Typed remote for the replies of one topic.
    pub fn forum_replies(&self, access_token: &str, topic_id: i64) -> RepliesRemote {
        RepliesRemote {
            gateway: self.clone(),
            token: access_token.to_string(),
            topic_id,
        }
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, access_token: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| CoreError::RemoteFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::RemoteFetch(format!("{path}: HTTP {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| CoreError::RemoteFetch(format!("{path}: {e}")))
    }

    /// Generic POST with JSON body and JSON response.
    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| CoreError::RemotePush(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::RemotePush(format!("{path}: HTTP {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| CoreError::RemotePush(format!("{path}: {e}")))
    }
}

pub struct PostsRemote {
    gateway: SyncGateway,
    token: String,
}

impl RemoteCollection<Post> for PostsRemote {
    async fn fetch(&self) -> Result<Vec<Post>> {
        self.gateway.get_json("/api/posts", &self.token).await
    }

    async fn push(&self, item: &Post) -> Result<Post> {
        self.gateway.post_json("/api/posts", &self.token, item).await
    }
}

pub struct CommentsRemote {
    gateway: SyncGateway,
    token: String,
    post_id: i64,
}

impl RemoteCollection<Comment> for CommentsRemote {
    async fn fetch(&self) -> Result<Vec<Comment>> {
        let path = format!("/api/posts/{}/comments", self.post_id);
        self.gateway.get_json(&path, &self.token).await
    }

    async fn push(&self, item: &Comment) -> Result<Comment> {
        let path = format!("/api/posts/{}/comments", self.post_id);
        self.gateway.post_json(&path, &self.token, item).await
    }
}

pub struct LikesRemote {
    gateway: SyncGateway,
    token: String,
    post_id: i64,
}

impl RemoteCollection<PostLike> for LikesRemote {
    async fn fetch(&self) -> Result<Vec<PostLike>> {
        let path = format!("/api/posts/{}/likes", self.post_id);
        self.gateway.get_json(&path, &self.token).await
    }

    async fn push(&self, item: &PostLike) -> Result<PostLike> {
        let path = format!("/api/posts/{}/like", self.post_id);
        self.gateway.post_json(&path, &self.token, item).await
    }
}

pub struct CategoriesRemote {
    gateway: SyncGateway,
    token: String,
}

impl RemoteCollection<ForumCategory> for CategoriesRemote {
    async fn fetch(&self) -> Result<Vec<ForumCategory>> {
        self.gateway.get_json("/api/forum/categories", &self.token).await
    }

    async fn push(&self, _item: &ForumCategory) -> Result<ForumCategory> {
        // Categories are maintained server-side only.
        Err(CoreError::RemotePush("forum categories are read-only".into()))
    }
}

pub struct TopicsRemote {
    gateway: SyncGateway,
    token: String,
    category_id: i64,
}

impl RemoteCollection<ForumTopic> for TopicsRemote {
    async fn fetch(&self) -> Result<Vec<ForumTopic>> {
        let path = format!("/api/forum/categories/{}/topics", self.category_id);
        self.gateway.get_json(&path, &self.token).await
    }

    async fn push(&self, item: &ForumTopic) -> Result<ForumTopic> {
        self.gateway
            .post_json("/api/forum/topics", &self.token, item)
            .await
    }
}

pub struct RepliesRemote {
    gateway: SyncGateway,
    token: String,
    topic_id: i64,
}

/// Topic detail response; the server embeds the reply list.
#[derive(serde::Deserialize)]
struct TopicDetail {
    #[serde(default)]
    replies: Vec<ForumReply>,
}

impl RemoteCollection<ForumReply> for RepliesRemote {
    async fn fetch(&self) -> Result<Vec<ForumReply>> {
        let path = format!("/api/forum/topics/{}", self.topic_id);
        let detail: TopicDetail = self.gateway.get_json(&path, &self.token).await?;
        Ok(detail.replies)
    }

    async fn push(&self, item: &ForumReply) -> Result<ForumReply> {
        let path = format!("/api/forum/topics/{}/replies", self.topic_id);
        self.gateway.post_json(&path, &self.token, item).await
    }
}

//! REST implementation of the remote gateway.
//!
//! Thin `reqwest`-based client for the feed backend. Every trait method maps
//! to exactly one HTTP request; there is no retry, caching or queueing here.
//! Timeouts are whatever the underlying transport defaults to.
//!
//! Status mapping: 404 and 409 on mutations become [`FeedError::Conflict`]
//! (stale id, parent already gone); any other non-success status and all
//! transport failures become [`FeedError::Network`].

use crate::error::{FeedError, Result};
use crate::gateway::{
    CommentPatch, CreateCommentRequest, FeedPageResponse, FeedQuery, LikeCount, LikeStatus,
    RemoteGateway,
};
use crate::types::{Comment, CommentId, ContentKind, ContentRef, PostId};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// Returns the URL path segment for a content kind.
fn kind_segment(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Post => "posts",
        ContentKind::Comment => "comments",
    }
}

/// REST gateway backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    /// HTTP client.
    client: Client,
    /// Base URL of the backend, without trailing slash.
    base_url: String,
}

impl HttpGateway {
    /// Creates a gateway for the given backend base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Creates a gateway reusing an existing HTTP client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a full URL from a path.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Converts a non-success response into the matching error.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND | StatusCode::CONFLICT => Err(FeedError::conflict(format!(
                "{}: {}",
                status,
                body.trim()
            ))),
            _ => Err(FeedError::network(format!("{}: {}", status, body.trim()))),
        }
    }

    /// Checks the response status and decodes the JSON body.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| FeedError::serialization(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    #[instrument(skip(self))]
    async fn like_content(&self, target: &ContentRef) -> Result<()> {
        let url = self.url(&format!("{}/{}/like", kind_segment(target.kind), target.id));
        let response = self.client.post(url).send().await?;
        Self::check(response).await?;
        debug!(%target, "liked content");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn unlike_content(&self, target: &ContentRef) -> Result<()> {
        let url = self.url(&format!("{}/{}/like", kind_segment(target.kind), target.id));
        let response = self.client.delete(url).send().await?;
        Self::check(response).await?;
        debug!(%target, "unliked content");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_like_status(&self, target: &ContentRef) -> Result<LikeStatus> {
        let url = self.url(&format!(
            "{}/{}/like/status",
            kind_segment(target.kind),
            target.id
        ));
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    #[instrument(skip(self))]
    async fn get_like_count(&self, target: &ContentRef) -> Result<LikeCount> {
        let url = self.url(&format!(
            "{}/{}/like/count",
            kind_segment(target.kind),
            target.id
        ));
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, request))]
    async fn create_comment(&self, request: CreateCommentRequest) -> Result<Comment> {
        let url = self.url("comments");
        let response = self.client.post(url).json(&request).send().await?;
        let comment: Comment = Self::decode(response).await?;
        debug!(comment_id = %comment.id, post_id = %comment.post_id, "created comment");
        Ok(comment)
    }

    #[instrument(skip(self, patch))]
    async fn edit_comment(&self, id: &CommentId, patch: CommentPatch) -> Result<Comment> {
        let url = self.url(&format!("comments/{}", id));
        let response = self.client.patch(url).json(&patch).send().await?;
        Self::decode(response).await
    }

    #[instrument(skip(self))]
    async fn delete_comment(&self, id: &CommentId) -> Result<()> {
        let url = self.url(&format!("comments/{}", id));
        let response = self.client.delete(url).send().await?;
        Self::check(response).await?;
        debug!(comment_id = %id, "deleted comment");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_comments_for_post(&self, post_id: &PostId, limit: usize) -> Result<Vec<Comment>> {
        let url = self.url(&format!("posts/{}/comments", post_id));
        let response = self
            .client
            .get(url)
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, query), fields(page = query.page))]
    async fn list_posts(&self, query: FeedQuery) -> Result<FeedPageResponse> {
        let url = self.url("posts");
        let mut params = vec![
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
            ("sort", query.filter.sort.to_string()),
        ];
        if let Some(community_id) = &query.filter.community_id {
            params.push(("community_id", community_id.clone()));
        }
        if query.filter.saved_only {
            params.push(("saved", "true".to_string()));
        }

        let response = self.client.get(url).query(&params).send().await?;
        let page: FeedPageResponse = Self::decode(response).await?;
        debug!(
            page = page.pagination.page,
            total_pages = page.pagination.total_pages,
            items = page.items.len(),
            "fetched feed page"
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn save_post(&self, post_id: &PostId) -> Result<()> {
        let url = self.url(&format!("posts/{}/save", post_id));
        let response = self.client.post(url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn unsave_post(&self, post_id: &PostId) -> Result<()> {
        let url = self.url(&format!("posts/{}/save", post_id));
        let response = self.client.delete(url).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

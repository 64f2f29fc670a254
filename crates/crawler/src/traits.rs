use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use session::Session;

use crate::error::Result;
use crate::params::{CommentParams, MediaParams, SearchParams, UserParams};

/// One fetched record, typed by which saver branch and which sub-tasks it
/// can trigger. Mirrors the spec's `FetchItem` whose payload is one of
/// Media, Comment, User.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchPayload {
    Media { media: Value, with_user: bool, with_comment: bool, comment_count: u64 },
    Comment { comment: Value, with_comment_user: bool },
    User { user: Value },
}

/// A record plus the task lineage it was produced under, pushed onto a
/// fan-out channel by a fetcher and consumed by `handle_channel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchItem {
    pub task_id: String,
    pub source_task_id: String,
    pub source: String,
    pub payload: FetchPayload,
}

/// What a search-page fetch reported, driving whether `handle_search`
/// submits a next-page task.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOutcome {
    pub has_more: bool,
    pub result_count: u64,
    pub next_cursor: u64,
    pub verification_required: bool,
}

/// What a comment-page fetch reported, driving whether `handle_comment`
/// submits a next-cursor task or signals the account is over its limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentOutcome {
    pub has_more: bool,
    pub result_count: u64,
    pub next_cursor: u64,
}

/// One media source's wire format. Implementations own request signing,
/// HTML/JSON parsing and pagination cursors; the orchestrator only reacts
/// to the typed outcomes below. Mirrors the per-media crawler/fetcher pair
/// the original registers for each site.
#[async_trait]
pub trait Crawler: Send + Sync {
    fn media_code(&self) -> &str;

    /// Fetches one page of a keyword search, pushing every resulting media
    /// item onto `channel` as it's read off the wire.
    async fn fetch_search(
        &self,
        session: &Session,
        channel: &mpsc::Sender<FetchItem>,
        task_id: &str,
        source_task_id: &str,
        params: &SearchParams,
    ) -> Result<SearchOutcome>;

    /// Fetches one media item by id and pushes it onto `channel`.
    async fn fetch_media(
        &self,
        session: &Session,
        channel: &mpsc::Sender<FetchItem>,
        task_id: &str,
        source_task_id: &str,
        params: &MediaParams,
    ) -> Result<()>;

    /// Fetches one user profile by id and pushes it onto `channel`.
    async fn fetch_user(
        &self,
        session: &Session,
        channel: &mpsc::Sender<FetchItem>,
        task_id: &str,
        source_task_id: &str,
        params: &UserParams,
    ) -> Result<()>;

    /// Fetches one page of a media item's comments, pushing each comment
    /// onto `channel` as it's read off the wire.
    async fn fetch_comment(
        &self,
        session: &Session,
        channel: &mpsc::Sender<FetchItem>,
        task_id: &str,
        source_task_id: &str,
        params: &CommentParams,
    ) -> Result<CommentOutcome>;
}

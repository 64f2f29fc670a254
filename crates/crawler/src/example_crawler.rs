//! A concrete, platform-neutral crawler exercising every branch the
//! orchestrator can take: paginated search, comment fan-out, and plain
//! media/user lookups. Stands in for the original's per-site
//! crawler/fetcher/saver trio without carrying over any site-specific
//! wire format or parsing.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use session::Session;

use crate::error::{CrawlerError, Result};
use crate::params::{CommentParams, MediaParams, SearchParams, UserParams};
use crate::traits::{Crawler, CommentOutcome, FetchItem, FetchPayload, SearchOutcome};

/// One page of search results as the backend reports them.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub items: Vec<Value>,
    pub has_more: bool,
    pub next_cursor: u64,
    pub verification_required: bool,
}

/// One page of comments as the backend reports them.
#[derive(Debug, Clone, Default)]
pub struct CommentPage {
    pub items: Vec<Value>,
    pub has_more: bool,
    pub next_cursor: u64,
}

/// The wire-format-owning half of a media source: everything
/// `ExampleCrawler` needs to turn a session-bound request into raw JSON
/// records. A real integration implements this against one platform's API
/// and request signing; `ExampleCrawler` handles the pagination and
/// fan-out bookkeeping around it.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn search_page(&self, session: &Session, keyword: &str, page: u64, cursor: u64) -> Result<SearchPage>;
    async fn media_item(&self, session: &Session, media_id: &str) -> Result<Value>;
    async fn user_item(&self, session: &Session, user_id: &str) -> Result<Value>;
    async fn comment_page(&self, session: &Session, media_id: &str, cursor: u64) -> Result<CommentPage>;
}

pub struct ExampleCrawler<B: Backend> {
    media_code: String,
    backend: B,
    with_user: bool,
    with_comment: bool,
    with_comment_user: bool,
}

impl<B: Backend> ExampleCrawler<B> {
    pub fn new(media_code: impl Into<String>, backend: B, with_user: bool, with_comment: bool, with_comment_user: bool) -> Self {
        Self { media_code: media_code.into(), backend, with_user, with_comment, with_comment_user }
    }

    fn comment_count(item: &Value) -> u64 {
        item.get("comment_count").and_then(Value::as_u64).unwrap_or(0)
    }

    async fn push(channel: &mpsc::Sender<FetchItem>, item: FetchItem) -> Result<()> {
        channel.send(item).await.map_err(|_| CrawlerError::Fetch("fan-out channel closed".to_string()))
    }
}

#[async_trait]
impl<B: Backend> Crawler for ExampleCrawler<B> {
    fn media_code(&self) -> &str {
        &self.media_code
    }

    async fn fetch_search(
        &self,
        session: &Session,
        channel: &mpsc::Sender<FetchItem>,
        task_id: &str,
        source_task_id: &str,
        params: &SearchParams,
    ) -> Result<SearchOutcome> {
        let page = self.backend.search_page(session, &params.keyword, params.page, params.cursor).await?;

        for item in &page.items {
            let payload = FetchPayload::Media {
                media: item.clone(),
                with_user: self.with_user,
                with_comment: self.with_comment,
                comment_count: Self::comment_count(item),
            };
            Self::push(channel, FetchItem { task_id: task_id.to_string(), source_task_id: source_task_id.to_string(), source: params.keyword.clone(), payload })
                .await?;
        }

        Ok(SearchOutcome {
            has_more: page.has_more,
            result_count: page.items.len() as u64,
            next_cursor: page.next_cursor,
            verification_required: page.verification_required,
        })
    }

    async fn fetch_media(&self, session: &Session, channel: &mpsc::Sender<FetchItem>, task_id: &str, source_task_id: &str, params: &MediaParams) -> Result<()> {
        let item = self.backend.media_item(session, &params.media_id).await?;
        let payload = FetchPayload::Media { media: item, with_user: self.with_user, with_comment: self.with_comment, comment_count: 0 };
        Self::push(channel, FetchItem { task_id: task_id.to_string(), source_task_id: source_task_id.to_string(), source: format!("media:{}", params.media_id), payload }).await
    }

    async fn fetch_user(&self, session: &Session, channel: &mpsc::Sender<FetchItem>, task_id: &str, source_task_id: &str, params: &UserParams) -> Result<()> {
        let item = self.backend.user_item(session, &params.user_id).await?;
        let payload = FetchPayload::User { user: item };
        Self::push(channel, FetchItem { task_id: task_id.to_string(), source_task_id: source_task_id.to_string(), source: format!("user:{}", params.user_id), payload }).await
    }

    async fn fetch_comment(
        &self,
        session: &Session,
        channel: &mpsc::Sender<FetchItem>,
        task_id: &str,
        source_task_id: &str,
        params: &CommentParams,
    ) -> Result<CommentOutcome> {
        let page = self.backend.comment_page(session, &params.media_id, params.cursor).await?;

        for item in &page.items {
            let payload = FetchPayload::Comment { comment: item.clone(), with_comment_user: self.with_comment_user };
            Self::push(
                channel,
                FetchItem { task_id: task_id.to_string(), source_task_id: source_task_id.to_string(), source: format!("media:{}", params.media_id), payload },
            )
            .await?;
        }

        Ok(CommentOutcome { has_more: page.has_more, result_count: page.items.len() as u64, next_cursor: page.next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use proxy::{ProxyInfo, ProxyKind};
    use serde_json::json;
    use std::sync::Mutex;
    use webcore::collaborators::Account;

    struct ScriptedBackend {
        search_pages: Mutex<Vec<SearchPage>>,
        comment_pages: Mutex<Vec<CommentPage>>,
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn search_page(&self, _session: &Session, _keyword: &str, _page: u64, _cursor: u64) -> Result<SearchPage> {
            Ok(self.search_pages.lock().unwrap().remove(0))
        }

        async fn media_item(&self, _session: &Session, media_id: &str) -> Result<Value> {
            Ok(json!({"id": media_id}))
        }

        async fn user_item(&self, _session: &Session, user_id: &str) -> Result<Value> {
            Ok(json!({"id": user_id}))
        }

        async fn comment_page(&self, _session: &Session, _media_id: &str, _cursor: u64) -> Result<CommentPage> {
            Ok(self.comment_pages.lock().unwrap().remove(0))
        }
    }

    fn test_session() -> Session {
        Session {
            account: Account {
                user_id: "u1".to_string(),
                media_code: "demo".to_string(),
                account_type: 0,
                status: 0,
                is_real: true,
                expires_at: Utc::now() + ChronoDuration::hours(1),
            },
            proxy: ProxyInfo {
                key: "p1".to_string(),
                kind: ProxyKind::Dynamic,
                region: "000000".to_string(),
                address: "http://127.0.0.1:9".to_string(),
                useable: true,
                expires_at: Utc::now() + ChronoDuration::hours(1),
            },
            created_at: Utc::now(),
            expires_at: Utc::now() + ChronoDuration::hours(1),
            verification_required: false,
            enabled: true,
            in_used: true,
        }
    }

    #[tokio::test]
    async fn search_page_pushes_one_media_item_per_result() {
        let backend = ScriptedBackend {
            search_pages: Mutex::new(vec![SearchPage { items: vec![json!({"id": "m1"})], has_more: true, next_cursor: 5, verification_required: false }]),
            comment_pages: Mutex::new(vec![]),
        };
        let crawler = ExampleCrawler::new("demo", backend, true, true, true);
        let (tx, mut rx) = mpsc::channel(8);

        let outcome = crawler.fetch_search(&test_session(), &tx, "t1", "t1", &SearchParams { keyword: "rust".to_string(), page: 0, cursor: 0 }).await.unwrap();

        assert!(outcome.has_more);
        assert_eq!(outcome.next_cursor, 5);
        let item = rx.recv().await.unwrap();
        assert!(matches!(item.payload, FetchPayload::Media { with_user: true, with_comment: true, .. }));
    }

    #[tokio::test]
    async fn comment_page_reports_result_count_for_overlimit_detection() {
        let backend = ScriptedBackend { search_pages: Mutex::new(vec![]), comment_pages: Mutex::new(vec![CommentPage { items: vec![], has_more: false, next_cursor: 0 }]) };
        let crawler = ExampleCrawler::new("demo", backend, false, false, false);
        let (tx, _rx) = mpsc::channel(8);

        let outcome = crawler.fetch_comment(&test_session(), &tx, "t1", "t1", &CommentParams { media_id: "m1".to_string(), cursor: 0 }).await.unwrap();

        assert_eq!(outcome.result_count, 0);
        assert!(!outcome.has_more);
    }
}

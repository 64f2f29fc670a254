use serde::{Deserialize, Serialize};

/// Default page size used to turn a caller's `max_count` into a page
/// ceiling for paginated search/comment handlers.
pub const DEFAULT_PAGE_SIZE: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlType {
    Search,
    Media,
    User,
}

/// The request a caller submits to start a crawl. Mirrors the original's
/// `CrawlParams` accepted by `POST /v1/crawl/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlParams {
    pub media_code: String,
    pub crawl_type: CrawlType,
    pub region: String,
    pub max_count: u64,
    pub keywords: Vec<String>,
    pub with_user: bool,
    pub with_comment: bool,
    pub with_comment_user: bool,
    pub with_all_creations: bool,
    pub auto_pagination: bool,
    pub target_purge_count: u64,
}

impl CrawlParams {
    /// `ceil(maxCount / pageSize)`. A `max_count` of zero still allows a
    /// single page through.
    pub fn max_page(&self) -> u64 {
        if self.max_count == 0 {
            return 1;
        }
        (self.max_count as f64 / DEFAULT_PAGE_SIZE as f64).ceil() as u64
    }
}

/// Payload for the `<media>:search` queue: one page of a keyword search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub keyword: String,
    pub page: u64,
    pub cursor: u64,
}

/// Payload for the `<media>:media` queue: one media item lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaParams {
    pub media_id: String,
}

/// Payload for the `<media>:user` queue: one user profile lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserParams {
    pub user_id: String,
}

/// Payload for the `<media>:comment` queue: one page of a media's comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentParams {
    pub media_id: String,
    pub cursor: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_count: u64) -> CrawlParams {
        CrawlParams {
            media_code: "demo".to_string(),
            crawl_type: CrawlType::Search,
            region: "000000".to_string(),
            max_count,
            keywords: vec!["rust".to_string()],
            with_user: false,
            with_comment: false,
            with_comment_user: false,
            with_all_creations: false,
            auto_pagination: true,
            target_purge_count: 0,
        }
    }

    #[test]
    fn max_page_ceils_division_by_page_size() {
        assert_eq!(params(0).max_page(), 1);
        assert_eq!(params(1).max_page(), 1);
        assert_eq!(params(DEFAULT_PAGE_SIZE).max_page(), 1);
        assert_eq!(params(DEFAULT_PAGE_SIZE + 1).max_page(), 2);
        assert_eq!(params(DEFAULT_PAGE_SIZE * 3).max_page(), 3);
    }
}

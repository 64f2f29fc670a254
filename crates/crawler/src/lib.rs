pub mod error;
pub mod example_crawler;
pub mod jobs;
pub mod kernel;
pub mod manager;
pub mod params;
pub mod traits;

pub use error::{CrawlerError, Result};
pub use example_crawler::{Backend, CommentPage, ExampleCrawler, SearchPage};
pub use jobs::JobSubmitter;
pub use kernel::Kernel;
pub use manager::{CrawlManagerStatus, CrawlerManager, ROUND_MAX, ROUND_SLEEP};
pub use params::{CommentParams, CrawlParams, CrawlType, MediaParams, SearchParams, UserParams, DEFAULT_PAGE_SIZE};
pub use traits::{Crawler, CommentOutcome, FetchItem, FetchPayload, SearchOutcome};

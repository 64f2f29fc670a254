use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlerError {
    #[error("session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] scheduler::SchedulerError),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("no crawler registered for media code {0}")]
    NoCrawler(String),

    #[error("a crawl run is already in progress")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, CrawlerError>;

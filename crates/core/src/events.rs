use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Termination codes a crawl run can end with. Mirrors the original
/// `noctua` kernel's numeric end codes so nothing downstream has to guess
/// at stability-over-time guarantees for a textual reason string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum CrawlEndCode {
    NilSession = 10,
    ReachClean = 20,
    OverdLimit = 30,
    VerifyFail = 40,
    ForcedStop = 50,
    RoundMaxed = 60,
}

impl CrawlEndCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlEndCode::NilSession => "nil_session",
            CrawlEndCode::ReachClean => "reach_clean",
            CrawlEndCode::OverdLimit => "overd_limit",
            CrawlEndCode::VerifyFail => "verify_fail",
            CrawlEndCode::ForcedStop => "forced_stop",
            CrawlEndCode::RoundMaxed => "round_maxed",
        }
    }
}

/// Published on the event bus whenever a crawl run terminates, for any
/// reason. The event listener converges every one of these into a
/// scheduler shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlEndEvent {
    pub media_code: String,
    pub code: CrawlEndCode,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl CrawlEndEvent {
    pub fn new(media_code: impl Into<String>, code: CrawlEndCode, message: impl Into<String>) -> Self {
        Self {
            media_code: media_code.into(),
            code,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Published when a crawl run starts, before the scheduler is reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStartEvent {
    pub media_code: String,
    pub at: DateTime<Utc>,
}

impl CrawlStartEvent {
    pub fn new(media_code: impl Into<String>) -> Self {
        Self { media_code: media_code.into(), at: Utc::now() }
    }
}

/// One entry on the outward-facing runtime notification channel (spec
/// §6's "Runtime event channel", bounded at 5000).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeData {
    pub kind: String,
    pub payload: EventData,
    pub at: DateTime<Utc>,
}

impl RuntimeData {
    pub fn new(kind: impl Into<String>, payload: EventData) -> Self {
        Self { kind: kind.into(), payload, at: Utc::now() }
    }
}

/// The payload carried on a `RuntimeData` notification. Kept as an enum
/// rather than a raw JSON blob so handlers registered via
/// `Kernel::add_runtime_handler` get typed data without re-parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventData {
    CrawlStarted { media_code: String },
    CrawlEnded { media_code: String, code: CrawlEndCode, message: String },
    Message(String),
}

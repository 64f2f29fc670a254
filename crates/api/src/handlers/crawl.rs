use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use webcore::AppError;

use crawler::{CrawlParams, CrawlType};

use crate::AppState;

#[derive(Deserialize)]
pub struct StartCrawlRequest {
    pub media_code: String,
    pub crawl_type: CrawlType,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub max_count: u64,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub with_user: bool,
    #[serde(default)]
    pub with_comment: bool,
    #[serde(default)]
    pub with_comment_user: bool,
    #[serde(default)]
    pub with_all_creations: bool,
    #[serde(default)]
    pub auto_pagination: bool,
    #[serde(default)]
    pub target_purge_count: u64,
}

/// Validates the request and fires the crawl in the background, mirroring
/// the original's `/v1/crawl/start` controller: no task id is handed back,
/// only an acknowledgement that the run was accepted.
pub async fn start(State(state): State<Arc<AppState>>, Json(req): Json<StartCrawlRequest>) -> Result<Json<Value>, AppError> {
    if req.media_code.is_empty() {
        return Err(AppError::BadRequest("media_code must not be empty".to_string()));
    }
    if req.keywords.is_empty() {
        return Err(AppError::BadRequest("keywords must not be empty".to_string()));
    }

    let params = CrawlParams {
        media_code: req.media_code,
        crawl_type: req.crawl_type,
        region: req.region.unwrap_or_else(|| "000000".to_string()),
        max_count: req.max_count,
        keywords: req.keywords,
        with_user: req.with_user,
        with_comment: req.with_comment,
        with_comment_user: req.with_comment_user,
        with_all_creations: req.with_all_creations,
        auto_pagination: req.auto_pagination,
        target_purge_count: req.target_purge_count,
    };

    state.kernel.start_crawl(params);

    Ok(Json(json!({ "success": true })))
}

/// Global crawl status, no path parameter — mirrors the original's
/// `/v1/crawl/status` which returns `Kernel.CrawlerManager.Status()` directly.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let status = state.kernel.crawl_status().await;
    Json(json!({ "success": true, "data": status }))
}

/// Global stop, no path parameter — mirrors the original's `/v1/crawl/stop`
/// which calls `Kernel.Scheduler.Shutdown()` unconditionally.
pub async fn stop(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.kernel.stop_crawl().await;
    Json(json!({ "success": true, "message": "scheduler shut down" }))
}

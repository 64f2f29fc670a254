use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{crawl, health, info, scheduler};
use crate::AppState;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health/live", get(health::live))
        .route("/v1/crawl/start", post(crawl::start))
        .route("/v1/crawl/status", get(crawl::status))
        .route("/v1/crawl/stop", post(crawl::stop))
        .route("/v1/scheduler/pause", post(scheduler::pause))
        .route("/v1/scheduler/resume", post(scheduler::resume))
        .route("/v1/scheduler/status", get(scheduler::status))
        .route("/v1/scheduler/taskTree", get(scheduler::task_tree))
        .route("/v1/info/sessionStatus", get(info::session_status))
}

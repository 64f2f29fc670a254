use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::AppState;

pub async fn session_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let sessions = state.kernel.sessions.status().await;
    let proxies = state.kernel.proxy_pool.status().await;
    Json(json!({ "success": true, "data": { "sessions": sessions, "proxies": proxies } }))
}

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use webcore::AppError;

use crate::AppState;

#[derive(Deserialize)]
pub struct TaskTreeQuery {
    pub root_task_id: String,
}

pub async fn pause(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    state.kernel.scheduler.pause();
    Ok(Json(json!({ "success": true, "message": "scheduler paused" })))
}

pub async fn resume(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    state.kernel.scheduler.resume();
    Ok(Json(json!({ "success": true, "message": "scheduler resumed" })))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let status = state.kernel.scheduler.status().await;
    Json(json!({ "success": true, "data": status }))
}

pub async fn task_tree(State(state): State<Arc<AppState>>, Query(query): Query<TaskTreeQuery>) -> Result<Json<Value>, AppError> {
    let tree = state
        .kernel
        .scheduler
        .get_task_tree(&query.root_task_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("no task {}", query.root_task_id)))?;
    Ok(Json(json!({ "success": true, "data": tree })))
}

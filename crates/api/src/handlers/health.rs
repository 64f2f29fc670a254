use axum::response::Json;
use serde_json::{json, Value};

pub async fn live() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "crawl-core-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now()
    }))
}

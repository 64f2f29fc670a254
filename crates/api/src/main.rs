use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use api::AppState;
use crawler::Kernel;
use proxy::{ProxyInfo, ProxyKind, ProxySource};
use webcore::collaborators::{MemoryAccountStore, MemoryCache, MemoryDataSink, NullTaskRecordSink};
use webcore::Config;

/// Stand-in proxy source until a real vendor integration is wired in.
/// Mints addresses that never actually route anywhere — fine for
/// exercising the scheduler/session/crawler wiring, not for a live crawl.
struct LoopbackProxySource;

#[async_trait::async_trait]
impl ProxySource for LoopbackProxySource {
    async fn acquire(&self, kind: ProxyKind, region: &str) -> proxy::Result<ProxyInfo> {
        Ok(ProxyInfo {
            key: format!("{}-{}-{}", kind.as_str(), region, uuid::Uuid::new_v4()),
            kind,
            region: region.to_string(),
            address: "http://127.0.0.1:9".to_string(),
            useable: true,
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    webcore::logging::init();

    let config = Config::from_env()?;
    info!(host = %config.server.host, port = config.server.port, "starting API server");

    let kernel = Kernel::new(
        &config,
        Arc::new(MemoryAccountStore::default()),
        Arc::new(MemoryCache::default()),
        Arc::new(LoopbackProxySource),
        Arc::new(NullTaskRecordSink),
        Arc::new(MemoryDataSink::default()),
    )
    .await;

    let state = Arc::new(AppState { kernel: Arc::new(kernel), config: config.clone() });

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any).allow_origin(Any);

    let app = Router::new()
        .route("/", get(root))
        .nest("/api", api::api_routes())
        .layer(ServiceBuilder::new().layer(cors).layer(axum_middleware::from_fn(api::middleware::logging)))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.server.host, config.server.port)).await?;
    info!("API server listening on {}:{}", config.server.host, config.server.port);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "service": "crawl-core-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use proxy::{ProxyInfo, ProxyKind, ProxySource};
use webcore::collaborators::{MemoryAccountStore, MemoryCache, MemoryDataSink, NullTaskRecordSink};

use crawler::{CrawlParams, CrawlType};

#[derive(Parser)]
#[command(name = "crawler")]
#[command(about = "Runs a single crawl against the in-process kernel, for local testing")]
struct Cli {
    #[arg(long)]
    media_code: String,

    #[arg(long = "keyword", required = true)]
    keywords: Vec<String>,

    #[arg(long, default_value = "000000")]
    region: String,

    #[arg(long, default_value = "100")]
    max_count: u64,
}

/// A no-op proxy source for the standalone binary: mints an address that
/// never actually routes anywhere. The CLI is for exercising the
/// scheduler/session/crawler wiring locally, not for a real crawl.
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
    let cli = Cli::parse();

    let config = webcore::Config::from_env()?;
    let kernel = Arc::new(
        crawler::Kernel::new(
            &config,
            Arc::new(MemoryAccountStore::default()),
            Arc::new(MemoryCache::default()),
            Arc::new(LoopbackProxySource),
            Arc::new(NullTaskRecordSink),
            Arc::new(MemoryDataSink::default()),
        )
        .await,
    );

    let params = CrawlParams {
        media_code: cli.media_code.clone(),
        crawl_type: CrawlType::Search,
        region: cli.region.clone(),
        max_count: cli.max_count,
        keywords: cli.keywords.clone(),
        with_user: true,
        with_comment: true,
        with_comment_user: false,
        with_all_creations: false,
        auto_pagination: true,
        target_purge_count: 0,
    };

    kernel.start_crawl(params);
    info!(media_code = %cli.media_code, "crawl submitted");

    kernel.scheduler.wait_until_empty().await;
    info!("crawl finished");
    Ok(())
}

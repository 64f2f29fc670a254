use std::sync::Arc;

use webcore::collaborators::{DataSink, TaskRecordSink};
use webcore::config::Config;
use webcore::EventBus;

use proxy::{ProxyPool, ProxySource};
use scheduler::Scheduler;
use session::SessionManager;
use webcore::collaborators::{AccountStore, Cache};

use crate::manager::{CrawlManagerStatus, CrawlerManager};
use crate::params::CrawlParams;
use crate::traits::Crawler;

/// Composition root: wires the scheduler, proxy pool, session manager and
/// event bus together and owns the registered crawlers. Grounded on the
/// original kernel's bootstrap, which does the same wiring in `New`.
pub struct Kernel {
    pub scheduler: Scheduler,
    pub proxy_pool: Arc<ProxyPool>,
    pub sessions: Arc<SessionManager>,
    pub bus: Arc<EventBus>,
    pub crawler_manager: Arc<CrawlerManager>,
}

impl Kernel {
    pub async fn new(
        config: &Config,
        accounts: Arc<dyn AccountStore>,
        cache: Arc<dyn Cache>,
        proxy_source: Arc<dyn ProxySource>,
        record_sink: Arc<dyn TaskRecordSink>,
        data_sink: Arc<dyn DataSink>,
    ) -> Self {
        let proxy_pool = ProxyPool::new(config.proxy.clone(), proxy_source);
        let sessions = Arc::new(SessionManager::new(config.session.clone(), accounts, cache, proxy_pool.clone()));
        let bus = Arc::new(EventBus::new(1024));

        let scheduler = Scheduler::new(config.scheduler.clone(), record_sink);
        scheduler.reset().await;

        let crawler_manager = Arc::new(CrawlerManager::new(sessions.clone(), scheduler.clone(), data_sink, bus.clone()));

        Self { scheduler, proxy_pool, sessions, bus, crawler_manager }
    }

    pub async fn register_crawler(&self, crawler: Arc<dyn Crawler>) {
        self.crawler_manager.register(crawler).await;
    }

    /// Fires a crawl run in the background and returns immediately,
    /// mirroring the original's `go func() { Run(...) }()` in its
    /// `/v1/crawl/start` controller: the caller gets no task id, only an
    /// acknowledgement that the run was kicked off.
    pub fn start_crawl(self: &Arc<Self>, params: CrawlParams) {
        let kernel = self.clone();
        tokio::spawn(async move {
            if let Err(err) = kernel.crawler_manager.run(params).await {
                tracing::error!(%err, "crawl run ended in error");
            }
        });
    }

    pub async fn crawl_status(&self) -> CrawlManagerStatus {
        self.crawler_manager.status().await
    }

    /// Shuts the scheduler down, aborting every in-flight task. Mirrors the
    /// original's `/v1/crawl/stop`, which calls `Kernel.Scheduler.Shutdown()`
    /// directly with no per-run scoping.
    pub async fn stop_crawl(&self) {
        self.scheduler.shutdown().await;
    }
}

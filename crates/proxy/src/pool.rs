use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use webcore::config::ProxyPoolConfig;

use crate::check::ProxyChecker;
use crate::error::{ProxyError, Result};
use crate::info::{ChannelStatus, ProxyInfo, ProxyKind, ProxyPoolStatus, ProxyRequest};

/// A bounded channel of ready-to-use proxies for one (kind, region) pair.
/// Mirrors the per-key `chan *ProxyInfo` the original pool keeps in its
/// region map.
struct Channel {
    tx: mpsc::Sender<ProxyInfo>,
    rx: RwLock<mpsc::Receiver<ProxyInfo>>,
    capacity: usize,
}

impl Channel {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self { tx, rx: RwLock::new(rx), capacity }
    }

    fn depth(&self) -> usize {
        self.capacity.saturating_sub(self.tx.capacity())
    }
}

fn channel_key(kind: ProxyKind, region: &str) -> String {
    format!("{}:{}", kind.as_str(), region)
}

/// Owns the live pool of proxies the crawler draws from. A proxy source
/// (whatever upstream vendor supplies raw addresses) is injected through
/// `ProxySource`; the pool itself only tracks availability, stickiness and
/// liveness re-checks.
#[async_trait::async_trait]
pub trait ProxySource: Send + Sync {
    /// Fetches a freshly minted proxy for the given kind/region. Returning
    /// `Err` means the upstream has nothing available right now.
    async fn acquire(&self, kind: ProxyKind, region: &str) -> Result<ProxyInfo>;
}

pub struct ProxyPool {
    config: ProxyPoolConfig,
    source: Arc<dyn ProxySource>,
    checker: ProxyChecker,
    channels: RwLock<HashMap<String, Arc<Channel>>>,
    in_flight: RwLock<HashMap<String, ProxyInfo>>,
    cancel: CancellationToken,
}

impl ProxyPool {
    pub fn new(config: ProxyPoolConfig, source: Arc<dyn ProxySource>) -> Arc<Self> {
        let pool = Arc::new(Self {
            config,
            source,
            checker: ProxyChecker::default(),
            channels: RwLock::new(HashMap::new()),
            in_flight: RwLock::new(HashMap::new()),
            cancel: CancellationToken::new(),
        });
        pool.clone().spawn_ensure_loop();
        pool.clone().spawn_sweep_loop();
        pool
    }

    fn min_for(&self, kind: ProxyKind) -> usize {
        match kind {
            ProxyKind::Dynamic => self.config.min_dynamic,
            ProxyKind::Static => self.config.min_static,
        }
    }

    fn enabled(&self, kind: ProxyKind) -> bool {
        match kind {
            ProxyKind::Dynamic => self.config.dynamic_enabled,
            ProxyKind::Static => self.config.static_enabled,
        }
    }

    async fn channel_for(&self, kind: ProxyKind, region: &str) -> Arc<Channel> {
        let key = channel_key(kind, region);
        if let Some(existing) = self.channels.read().await.get(&key) {
            return existing.clone();
        }
        let mut channels = self.channels.write().await;
        channels
            .entry(key)
            .or_insert_with(|| Arc::new(Channel::new(self.min_for(kind).max(1) * 4)))
            .clone()
    }

    /// Draws an available proxy, preferring a sticky key if supplied and
    /// still valid. Spec §4.5: static proxies are reused per-session rather
    /// than rotated every request.
    ///
    /// Any proxy that turns up expired, disabled, or failing its live check
    /// is dropped from circulation and the next one is tried, per spec
    /// §4.4: "a proxy whose expiry is in the future is assumed valid;
    /// otherwise an HTTP GET... with a 5s timeout and 2 retries".
    pub async fn get_available_proxy(&self, request: ProxyRequest) -> Result<ProxyInfo> {
        if !self.enabled(request.kind) {
            return Err(ProxyError::Unavailable(request.kind, request.region));
        }

        if let Some(sticky_key) = &request.sticky_key {
            if let Some(info) = self.in_flight.read().await.get(sticky_key).cloned() {
                if !info.is_expired() && self.checker.is_valid(&info.address, info.expires_at).await {
                    return Ok(info);
                }
                self.in_flight.write().await.remove(sticky_key);
            }
        }

        let channel = self.channel_for(request.kind, &request.region).await;
        let timeout = Duration::from_secs(self.config.proxy_timeout_secs);

        loop {
            let info = {
                let mut rx = channel.rx.write().await;
                time::timeout(timeout, rx.recv()).await.map_err(|_| ProxyError::Timeout)?.ok_or(ProxyError::ShutDown)?
            };

            if info.is_expired() || !info.useable {
                warn!(key = %info.key, "discarding stale or disabled proxy on lease");
                continue;
            }
            if !self.checker.is_valid(&info.address, info.expires_at).await {
                warn!(key = %info.key, "discarding proxy that failed its live check");
                continue;
            }

            self.in_flight.write().await.insert(info.key.clone(), info.clone());
            return Ok(info);
        }
    }

    /// Returns a previously leased proxy to circulation without discarding
    /// it, so the next caller for the same region can reuse it.
    pub async fn release_proxy(&self, info: ProxyInfo) {
        self.in_flight.write().await.remove(&info.key);
        if info.is_expired() {
            return;
        }
        let channel = self.channel_for(info.kind, &info.region).await;
        if channel.tx.try_send(info).is_err() {
            warn!("proxy channel full on release, dropping proxy");
        }
    }

    /// Discards a proxy outright (e.g. the caller detected it's dead or
    /// banned) instead of returning it to the channel.
    pub async fn remove_proxy(&self, key: &str) {
        self.in_flight.write().await.remove(key);
    }

    pub async fn status(&self) -> ProxyPoolStatus {
        let channels = self.channels.read().await;
        let mut out = Vec::with_capacity(channels.len());
        for (key, channel) in channels.iter() {
            let (kind_str, region) = key.split_once(':').unwrap_or((key.as_str(), ""));
            let kind = if kind_str == ProxyKind::Static.as_str() { ProxyKind::Static } else { ProxyKind::Dynamic };
            out.push(ChannelStatus {
                region: region.to_string(),
                kind,
                depth: channel.depth(),
                capacity: channel.capacity,
            });
        }
        ProxyPoolStatus {
            channels: out,
            in_use: self.in_flight.read().await.len(),
            total_known: self.in_flight.read().await.len(),
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Background loop that tops up every known channel back up to its
    /// minimum depth, mirroring the original's periodic `ensureMinimum`.
    fn spawn_ensure_loop(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut ticker = time::interval(Duration::from_secs(5));
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = ticker.tick() => self.ensure_minimums().await,
                }
            }
        });
    }

    async fn ensure_minimums(&self) {
        let keys: Vec<(ProxyKind, String)> = {
            let channels = self.channels.read().await;
            channels
                .keys()
                .filter_map(|key| {
                    let (kind_str, region) = key.split_once(':')?;
                    let kind = if kind_str == ProxyKind::Static.as_str() { ProxyKind::Static } else { ProxyKind::Dynamic };
                    Some((kind, region.to_string()))
                })
                .collect()
        };

        for (kind, region) in keys {
            if !self.enabled(kind) {
                continue;
            }
            let channel = self.channel_for(kind, &region).await;
            let min = self.min_for(kind);
            while channel.depth() < min {
                match self.source.acquire(kind, &region).await {
                    Ok(info) => {
                        if channel.tx.try_send(info).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(?kind, %region, %err, "failed to replenish proxy channel");
                        break;
                    }
                }
            }
        }
        info!("proxy pool replenishment pass complete");
    }

    /// Background loop, distinct from `ensure_minimums`'s 5s replenishment,
    /// that drains every channel every 10s and discards any proxy that has
    /// gone stale or started failing its live check while sitting idle.
    fn spawn_sweep_loop(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut ticker = time::interval(Duration::from_secs(10));
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = ticker.tick() => self.sweep_stale().await,
                }
            }
        });
    }

    async fn sweep_stale(&self) {
        let channels: Vec<(String, Arc<Channel>)> = self.channels.read().await.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        for (key, channel) in channels {
            let mut keep = Vec::new();
            let mut removed = 0usize;

            loop {
                let next = {
                    let mut rx = channel.rx.write().await;
                    rx.try_recv().ok()
                };
                let Some(info) = next else { break };

                if info.is_expired() || !info.useable || !self.checker.is_valid(&info.address, info.expires_at).await {
                    removed += 1;
                } else {
                    keep.push(info);
                }
            }

            for info in keep {
                if channel.tx.try_send(info).is_err() {
                    warn!(%key, "channel full while restoring swept proxies");
                    break;
                }
            }
            if removed > 0 {
                info!(%key, removed, "swept stale proxies from channel");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    struct FixedSource;

    #[async_trait::async_trait]
    impl ProxySource for FixedSource {
        async fn acquire(&self, kind: ProxyKind, region: &str) -> Result<ProxyInfo> {
            Ok(ProxyInfo {
                key: format!("{}-{}-{}", kind.as_str(), region, uuid::Uuid::new_v4()),
                kind,
                region: region.to_string(),
                address: "http://127.0.0.1:9".to_string(),
                useable: true,
                expires_at: Utc::now() + ChronoDuration::hours(1),
            })
        }
    }

    fn test_config() -> ProxyPoolConfig {
        ProxyPoolConfig { min_dynamic: 1, min_static: 1, dynamic_enabled: true, static_enabled: true, proxy_timeout_secs: 2 }
    }

    #[tokio::test]
    async fn lease_and_release_round_trips_a_proxy() {
        let pool = ProxyPool::new(test_config(), Arc::new(FixedSource));
        let channel = pool.channel_for(ProxyKind::Dynamic, "000000").await;
        channel
            .tx
            .send(ProxyInfo {
                key: "seed".to_string(),
                kind: ProxyKind::Dynamic,
                region: "000000".to_string(),
                address: "http://127.0.0.1:9".to_string(),
                useable: true,
                expires_at: Utc::now() + ChronoDuration::hours(1),
            })
            .await
            .unwrap();

        let leased = pool
            .get_available_proxy(ProxyRequest::new(ProxyKind::Dynamic, "000000"))
            .await
            .unwrap();
        assert_eq!(leased.key, "seed");
        assert_eq!(pool.in_flight.read().await.len(), 1);

        pool.release_proxy(leased).await;
        assert_eq!(pool.in_flight.read().await.len(), 0);
    }

    #[tokio::test]
    async fn disabled_kind_is_rejected_immediately() {
        let config = ProxyPoolConfig { dynamic_enabled: false, ..test_config() };
        let pool = ProxyPool::new(config, Arc::new(FixedSource));
        let err = pool
            .get_available_proxy(ProxyRequest::new(ProxyKind::Dynamic, "000000"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Unavailable(ProxyKind::Dynamic, _)));
    }
}

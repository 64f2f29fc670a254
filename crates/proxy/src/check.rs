use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

/// Probes an upstream proxy address to confirm it still routes traffic.
/// Mirrors `internal/proxy/utils.go`'s `isValidProxy`: a short request
/// against a well-known endpoint, any non-error response counts as valid.
#[derive(Debug, Clone)]
pub struct ProxyChecker {
    timeout: Duration,
    retries: u32,
    probe_url: String,
}

impl ProxyChecker {
    pub fn new(probe_url: impl Into<String>, timeout: Duration, retries: u32) -> Self {
        Self { timeout, retries, probe_url: probe_url.into() }
    }

    /// Returns true if `address` can be used to proxy a request to the probe
    /// URL. A proxy whose `expires_at` is still in the future is assumed
    /// valid without probing; otherwise attempts up to `retries + 1` times,
    /// each bounded by `timeout`.
    pub async fn is_valid(&self, address: &str, expires_at: DateTime<Utc>) -> bool {
        if expires_at > Utc::now() {
            return true;
        }

        for attempt in 0..=self.retries {
            if self.probe_once(address).await {
                return true;
            }
            debug!(%address, attempt, "proxy probe attempt failed");
        }
        false
    }

    async fn probe_once(&self, address: &str) -> bool {
        let proxy = match reqwest::Proxy::all(address) {
            Ok(p) => p,
            Err(err) => {
                debug!(%address, %err, "malformed proxy address");
                return false;
            }
        };

        let client = match reqwest::Client::builder().proxy(proxy).timeout(self.timeout).build() {
            Ok(c) => c,
            Err(err) => {
                debug!(%address, %err, "failed to build proxied client");
                return false;
            }
        };

        match client.get(&self.probe_url).send().await {
            Ok(resp) => resp.status().is_success() || resp.status().is_redirection(),
            Err(err) => {
                debug!(%address, %err, "proxy probe failed");
                false
            }
        }
    }
}

impl Default for ProxyChecker {
    fn default() -> Self {
        Self::new("https://www.google.com/generate_204", Duration::from_secs(5), 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_checker_builds_without_panicking() {
        let _checker = ProxyChecker::default();
    }

    #[tokio::test]
    async fn unexpired_proxy_is_valid_without_a_probe() {
        let checker = ProxyChecker::new("http://127.0.0.1:1", Duration::from_millis(1), 0);
        assert!(checker.is_valid("http://127.0.0.1:1", Utc::now() + chrono::Duration::hours(1)).await);
    }

    #[tokio::test]
    async fn expired_proxy_with_unroutable_address_fails_after_retries() {
        let checker = ProxyChecker::new("http://127.0.0.1:1", Duration::from_millis(50), 1);
        assert!(!checker.is_valid("not-a-valid-proxy-url", Utc::now() - chrono::Duration::hours(1)).await);
    }
}

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng as _;
use tokio::sync::RwLock;
use tracing::{info, warn};
use webcore::collaborators::{Account, AccountStore, Cache};
use webcore::config::SessionConfig;

use proxy::{ProxyKind, ProxyPool, ProxyRequest};

use crate::error::{Result, SessionError};
use crate::types::{Session, SessionManagerStatus, SessionParams};

fn session_key(media_code: &str, user_id: &str) -> String {
    format!("{media_code}:{user_id}")
}

fn user_proxy_cache_key(user_id: &str) -> String {
    format!("media:proxy:{user_id}")
}

/// Binds an account to a proxy for the lifetime of a crawl, the way
/// `kernel/session/session.go`'s `Manager` does: it first tries to reuse a
/// live session, falls back to drawing a fresh account from the store, and
/// remembers which account recently failed so the next draw doesn't
/// immediately retry it.
pub struct SessionManager {
    config: SessionConfig,
    accounts: Arc<dyn AccountStore>,
    cache: Arc<dyn Cache>,
    proxy_pool: Arc<ProxyPool>,
    active: RwLock<HashMap<String, Session>>,
    disabled_seen: RwLock<usize>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, accounts: Arc<dyn AccountStore>, cache: Arc<dyn Cache>, proxy_pool: Arc<ProxyPool>) -> Self {
        Self { config, accounts, cache, proxy_pool, active: RwLock::new(HashMap::new()), disabled_seen: RwLock::new(0) }
    }

    /// Reuses a live session if one matches, otherwise finds or mints an
    /// account, leases a proxy for it, and records the resulting binding as
    /// active. Mirrors `Manager.GetSession`.
    pub async fn get_session(&self, params: SessionParams) -> Result<Session> {
        let mut exclude = self.recently_failed(&params.media_code).await;

        if let Some(session) = self.reuse_existing(&params, &mut exclude).await {
            return Ok(session);
        }

        let account = match self.accounts.find_account(&params.media_code, &exclude).await.map_err(SessionError::Store)? {
            Some(account) if account.is_usable() && account.account_type == params.account_type => account,
            _ if params.allow_none_account => self.synthesize_temp_account(&params).await?,
            _ => return Err(SessionError::NoAccount(params.media_code.clone())),
        };

        let proxy_kind = if params.account_type > 1 { ProxyKind::Static } else { ProxyKind::Dynamic };
        let mut request = ProxyRequest::new(proxy_kind, params.region.clone());
        if proxy_kind == ProxyKind::Static {
            request.sticky_key = self.cache.get(&user_proxy_cache_key(&account.user_id)).await;
        }
        let proxy_info = self.proxy_pool.get_available_proxy(request).await.map_err(|err| SessionError::Proxy(err.to_string()))?;

        let expires_at = if proxy_info.useable {
            proxy_info.expires_at
        } else {
            Utc::now() + ChronoDuration::seconds(self.config.default_expiry_secs as i64)
        };

        let session = Session {
            account: account.clone(),
            proxy: proxy_info.clone(),
            created_at: Utc::now(),
            expires_at,
            verification_required: false,
            enabled: true,
            in_used: params.keep_alive,
        };

        self.active.write().await.insert(session_key(&session.account.media_code, &session.account.user_id), session.clone());

        if session.in_used && account.is_real && proxy_info.useable {
            self.cache
                .set(&user_proxy_cache_key(&account.user_id), proxy_info.key.clone(), StdDuration::from_secs(self.config.default_expiry_secs))
                .await;
        }

        Ok(session)
    }

    /// Scans the active map for a session this request can reuse, deleting
    /// expired or disabled ones it passes over and accumulating skipped
    /// user ids into `exclude` for the account-store fallback query.
    /// Mirrors the `sessions.Range(...)` walk in `Manager.GetSession`.
    async fn reuse_existing(&self, params: &SessionParams, exclude: &mut Vec<String>) -> Option<Session> {
        let mut active = self.active.write().await;
        let keys: Vec<String> = active
            .iter()
            .filter(|(_, s)| s.account.media_code == params.media_code)
            .map(|(k, _)| k.clone())
            .collect();

        for key in keys {
            let Some(session) = active.get(&key).cloned() else { continue };

            if session.account.account_type != params.account_type {
                continue;
            }
            if exclude.contains(&session.account.user_id) {
                continue;
            }
            if session.in_used {
                exclude.push(session.account.user_id.clone());
                continue;
            }
            if session.is_expired() || !session.enabled {
                active.remove(&key);
                continue;
            }

            if params.user_id.is_none() || params.user_id.as_deref() == Some(session.account.user_id.as_str()) {
                let mut found = session;
                if params.keep_alive {
                    found.in_used = true;
                    active.insert(key, found.clone());
                }
                return Some(found);
            }
            exclude.push(session.account.user_id.clone());
        }
        None
    }

    /// Drops a finished session's `in_used` flag without discarding the
    /// binding, so the same account/proxy pair can be reused by the next
    /// caller. Mirrors `Manager.ReleaseSession`.
    pub async fn release_session(&self, session: Session) {
        let key = session_key(&session.account.media_code, &session.account.user_id);
        {
            let mut active = self.active.write().await;
            if let Some(existing) = active.get_mut(&key) {
                existing.in_used = false;
            }
        }
        self.proxy_pool.release_proxy(session.proxy).await;
    }

    /// Swaps out a session's proxy (and, if the account itself looks
    /// implicated, the account too) after a failure, the way the original
    /// retries a fetch against a fresh binding instead of the same one.
    pub async fn replace_session(&self, failed: Session, params: SessionParams) -> Result<Session> {
        self.active.write().await.remove(&session_key(&failed.account.media_code, &failed.account.user_id));
        self.proxy_pool.remove_proxy(&failed.proxy.key).await;
        self.mark_recently_failed(&failed.account.media_code, &failed.account.user_id).await;
        self.get_session(params).await
    }

    /// Marks a session's binding as having hit a CAPTCHA/verification
    /// challenge so the caller can decide to force a renew rather than
    /// blindly retrying.
    pub async fn invalidate_session(&self, mut session: Session) -> Session {
        session.verification_required = true;
        self.active.write().await.insert(session_key(&session.account.media_code, &session.account.user_id), session.clone());
        session
    }

    /// Called when upstream reports an account is disabled (banned,
    /// suspended, credentials revoked). Persists the status change and
    /// evicts any live session bound to it.
    pub async fn on_account_disabled(&self, mut account: Account) -> Result<()> {
        account.status = Account::STATUS_DISABLED;
        self.accounts.upsert_account(account.clone()).await.map_err(SessionError::Store)?;
        if let Some(session) = self.active.write().await.remove(&session_key(&account.media_code, &account.user_id)) {
            self.proxy_pool.remove_proxy(&session.proxy.key).await;
        }
        *self.disabled_seen.write().await += 1;
        warn!(media_code = %account.media_code, user_id = %account.user_id, "account disabled");
        Ok(())
    }

    pub async fn status(&self) -> SessionManagerStatus {
        let active = self.active.read().await;
        SessionManagerStatus {
            active_sessions: active.values().filter(|s| s.in_used).count(),
            total_sessions: active.len(),
            disabled_accounts_seen: *self.disabled_seen.read().await,
        }
    }

    async fn recently_failed(&self, media_code: &str) -> Vec<String> {
        match self.cache.get(&format!("session:excluded:{media_code}")).await {
            Some(raw) => raw.split(',').filter(|s| !s.is_empty()).map(|s| s.to_string()).collect(),
            None => Vec::new(),
        }
    }

    async fn mark_recently_failed(&self, media_code: &str, user_id: &str) {
        let key = format!("session:excluded:{media_code}");
        let mut existing = self.recently_failed(media_code).await;
        if !existing.contains(&user_id.to_string()) {
            existing.push(user_id.to_string());
        }
        self.cache.set(&key, existing.join(","), StdDuration::from_secs(60)).await;
    }

    /// Mints a credential-less account when the store has nothing left,
    /// the way the original synthesizes a temporary account with a random
    /// id rather than failing the crawl outright. Spec §4.4.
    async fn synthesize_temp_account(&self, params: &SessionParams) -> Result<Account> {
        if !self.config.allow_none_account {
            return Err(SessionError::NoAccount(params.media_code.clone()));
        }
        let suffix = rand::rng().random::<u64>();
        let account = Account {
            user_id: params.user_id.clone().unwrap_or_else(|| format!("temp-{suffix:x}")),
            media_code: params.media_code.clone(),
            account_type: params.account_type,
            status: 0,
            is_real: false,
            expires_at: Utc::now() + ChronoDuration::seconds(self.config.default_expiry_secs as i64),
        };
        self.accounts.upsert_account(account.clone()).await.map_err(SessionError::Store)?;
        info!(media_code = %params.media_code, user_id = %account.user_id, "synthesized temporary account");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy::{ProxyInfo, ProxyKind, ProxySource};
    use std::time::Duration;
    use webcore::collaborators::{MemoryAccountStore, MemoryCache};
    use webcore::config::ProxyPoolConfig;

    struct FixedSource;

    #[async_trait::async_trait]
    impl ProxySource for FixedSource {
        async fn acquire(&self, kind: ProxyKind, region: &str) -> proxy::Result<ProxyInfo> {
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

    fn test_manager() -> SessionManager {
        let pool_config = ProxyPoolConfig { min_dynamic: 1, min_static: 1, dynamic_enabled: true, static_enabled: true, proxy_timeout_secs: 10 };
        let pool = ProxyPool::new(pool_config, Arc::new(FixedSource));
        let session_config = SessionConfig { allow_none_account: true, default_expiry_secs: 3600 };
        SessionManager::new(session_config, Arc::new(MemoryAccountStore::default()), Arc::new(MemoryCache::default()), pool)
    }

    fn params() -> SessionParams {
        SessionParams {
            media_code: "demo".to_string(),
            region: "000000".to_string(),
            account_type: 0,
            user_id: None,
            keep_alive: true,
            allow_none_account: true,
        }
    }

    #[tokio::test]
    async fn synthesizes_temp_account_when_store_is_empty() {
        let manager = test_manager();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let session = manager.get_session(params()).await.unwrap();
        assert!(!session.account.is_real);
        assert!(session.in_used);
        assert_eq!(manager.status().await.active_sessions, 1);
    }

    #[tokio::test]
    async fn release_session_keeps_binding_but_clears_in_used() {
        let manager = test_manager();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let session = manager.get_session(params()).await.unwrap();
        manager.release_session(session).await;
        let status = manager.status().await;
        assert_eq!(status.active_sessions, 0);
        assert_eq!(status.total_sessions, 1);
    }

    #[tokio::test]
    async fn reuses_released_session_instead_of_minting_a_new_account() {
        let manager = test_manager();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let first = manager.get_session(params()).await.unwrap();
        let user_id = first.account.user_id.clone();
        manager.release_session(first).await;

        let second = manager.get_session(params()).await.unwrap();
        assert_eq!(second.account.user_id, user_id);
        assert_eq!(manager.status().await.total_sessions, 1);
    }

    #[tokio::test]
    async fn in_used_session_is_excluded_and_a_second_account_is_minted() {
        let manager = test_manager();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let first = manager.get_session(params()).await.unwrap();

        let second = manager.get_session(params()).await.unwrap();
        assert_ne!(first.account.user_id, second.account.user_id);
        assert_eq!(manager.status().await.total_sessions, 2);
        assert_eq!(manager.status().await.active_sessions, 2);
    }
}

//! Trait-level contracts for the systems this crate treats as external
//! collaborators (spec §6): the account store, the key/value cache, data
//! sinks, the task-record store, and the request-signing service. Each
//! trait ships a minimal in-memory or no-op implementation so the
//! workspace is testable without a real Postgres/Redis/HTTP signer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// An account record as handed back by the account store. Mirrors the
/// fields `kernel/session/session.go` actually reads off
/// `model.MediaAccount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub media_code: String,
    pub account_type: i32,
    /// 0 = usable, 100 = disabled (the original's magic "Status" sentinel).
    pub status: i32,
    pub is_real: bool,
    pub expires_at: DateTime<Utc>,
}

impl Account {
    pub const STATUS_DISABLED: i32 = 100;

    pub fn is_usable(&self) -> bool {
        self.status != Self::STATUS_DISABLED && self.expires_at > Utc::now()
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find an account for `media_code`, excluding any id in `exclude`.
    async fn find_account(
        &self,
        media_code: &str,
        exclude: &[String],
    ) -> Result<Option<Account>, String>;

    async fn upsert_account(&self, account: Account) -> Result<(), String>;
}

/// In-memory account store, keyed by (media_code, user_id). Good enough
/// for tests and for running the crawler against synthesized accounts.
#[derive(Default, Clone)]
pub struct MemoryAccountStore {
    accounts: Arc<Mutex<HashMap<(String, String), Account>>>,
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_account(
        &self,
        media_code: &str,
        exclude: &[String],
    ) -> Result<Option<Account>, String> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .values()
            .find(|a| a.media_code == media_code && !exclude.contains(&a.user_id))
            .cloned())
    }

    async fn upsert_account(&self, account: Account) -> Result<(), String> {
        let mut accounts = self.accounts.lock().await;
        accounts.insert((account.media_code.clone(), account.user_id.clone()), account);
        Ok(())
    }
}

/// Key/value cache with per-key TTL, as used for session/proxy stickiness
/// (`pkg/cache/factory.go`'s `Cache` interface).
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
    async fn delete(&self, key: &str);
}

struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default, Clone)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            CacheEntry { value, expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default() },
        );
    }

    async fn delete(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

/// Destination for crawled payloads. The payload is an opaque JSON value
/// here on purpose — parsing/shaping platform-specific fields is outside
/// this crate's scope; concrete crawler implementations decide what goes
/// into `data`.
#[async_trait]
pub trait DataSink: Send + Sync {
    async fn save_media(&self, task_id: &str, data: serde_json::Value) -> Result<(), String>;
    async fn save_comment(&self, task_id: &str, data: serde_json::Value) -> Result<(), String>;
    async fn save_user(&self, task_id: &str, data: serde_json::Value) -> Result<(), String>;
}

#[derive(Default, Clone)]
pub struct MemoryDataSink {
    pub media: Arc<Mutex<Vec<serde_json::Value>>>,
    pub comments: Arc<Mutex<Vec<serde_json::Value>>>,
    pub users: Arc<Mutex<Vec<serde_json::Value>>>,
}

#[async_trait]
impl DataSink for MemoryDataSink {
    async fn save_media(&self, _task_id: &str, data: serde_json::Value) -> Result<(), String> {
        self.media.lock().await.push(data);
        Ok(())
    }

    async fn save_comment(&self, _task_id: &str, data: serde_json::Value) -> Result<(), String> {
        self.comments.lock().await.push(data);
        Ok(())
    }

    async fn save_user(&self, _task_id: &str, data: serde_json::Value) -> Result<(), String> {
        self.users.lock().await.push(data);
        Ok(())
    }
}

/// A persisted task record, upserted by `SubmitJob` the way
/// `internal/model/crawl_task.go`'s `UpsertModel` is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub queue_key: String,
    pub status: String,
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait TaskRecordSink: Send + Sync {
    async fn upsert(&self, record: TaskRecord) -> Result<(), String>;
}

/// Discards every record. Default when no persistence layer is wired up.
#[derive(Default, Clone)]
pub struct NullTaskRecordSink;

#[async_trait]
impl TaskRecordSink for NullTaskRecordSink {
    async fn upsert(&self, _record: TaskRecord) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemoryTaskRecordSink {
    pub records: Arc<Mutex<HashMap<String, TaskRecord>>>,
}

#[async_trait]
impl TaskRecordSink for MemoryTaskRecordSink {
    async fn upsert(&self, record: TaskRecord) -> Result<(), String> {
        self.records.lock().await.insert(record.task_id.clone(), record);
        Ok(())
    }
}

/// Outbound request-signing collaborator (spec §6 "Signing service
/// contract"). Real implementations call out to an HTTP signer; tests use
/// `NullSigningClient`, which signs nothing and passes requests through.
#[async_trait]
pub trait SigningClient: Send + Sync {
    async fn sign(&self, payload: &str) -> Result<String, String>;
}

#[derive(Default, Clone)]
pub struct NullSigningClient;

#[async_trait]
impl SigningClient for NullSigningClient {
    async fn sign(&self, payload: &str) -> Result<String, String> {
        Ok(payload.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_cache_round_trips_and_expires() {
        let cache = MemoryCache::default();
        cache.set("k", "v".to_string(), Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await, Some("v".to_string()));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn memory_account_store_excludes_seen_ids() {
        let store = MemoryAccountStore::default();
        store
            .upsert_account(Account {
                user_id: "u1".into(),
                media_code: "m".into(),
                account_type: 1,
                status: 0,
                is_real: true,
                expires_at: Utc::now() + chrono::Duration::days(1),
            })
            .await
            .unwrap();

        let found = store.find_account("m", &["u1".to_string()]).await.unwrap();
        assert!(found.is_none());

        let found = store.find_account("m", &[]).await.unwrap();
        assert!(found.is_some());
    }
}

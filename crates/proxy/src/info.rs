use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProxyKind {
    Dynamic,
    Static,
}

impl ProxyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyKind::Dynamic => "dynamic",
            ProxyKind::Static => "static",
        }
    }
}

/// Default region key used when a caller doesn't specify one. Mirrors the
/// original's literal `"000000"` sentinel.
pub const DEFAULT_REGION: &str = "000000";

/// One leased proxy. Mirrors `types/proxy.go`'s `ProxyInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyInfo {
    pub key: String,
    pub kind: ProxyKind,
    pub region: String,
    pub address: String,
    pub useable: bool,
    pub expires_at: DateTime<Utc>,
}

impl ProxyInfo {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// A request for a proxy handed to `ProxyPool::get_available_proxy`.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub kind: ProxyKind,
    pub region: String,
    /// When set, the pool tries to satisfy the request from this sticky
    /// key first (static-proxy reuse for a given user, spec §4.5).
    pub sticky_key: Option<String>,
}

impl ProxyRequest {
    pub fn new(kind: ProxyKind, region: impl Into<String>) -> Self {
        let region = region.into();
        let region = if region.is_empty() { DEFAULT_REGION.to_string() } else { region };
        Self { kind, region, sticky_key: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub region: String,
    pub kind: ProxyKind,
    pub depth: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyPoolStatus {
    pub channels: Vec<ChannelStatus>,
    pub in_use: usize,
    pub total_known: usize,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use proxy::ProxyInfo;
use webcore::collaborators::Account;

/// A live binding of one account to one proxy, held for up to
/// `expires_at`. Mirrors `types/session.go`'s `Session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub account: Account,
    pub proxy: ProxyInfo,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set once a CAPTCHA/verification challenge has been observed on this
    /// binding, so a caller can decide to force a renew instead of retrying.
    pub verification_required: bool,
    /// Cleared (and the session dropped from the map) once the bound
    /// account is reported disabled.
    pub enabled: bool,
    /// True while a caller is actively holding this binding. At most one
    /// session per (media_code, user_id) can be `in_used` at a time, since
    /// the active map is keyed on exactly that pair.
    pub in_used: bool,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Parameters a caller supplies when asking for a session. Mirrors
/// `kernel/session.SessionParams`.
#[derive(Debug, Clone, Default)]
pub struct SessionParams {
    pub media_code: String,
    pub region: String,
    pub account_type: i32,
    /// Request a specific user's session if already known; otherwise any
    /// matching, non-in-use session for this media/type is reused.
    pub user_id: Option<String>,
    /// If true, a reused or freshly built session is marked `in_used`
    /// before being handed back, per spec §4.5 step 2.
    pub keep_alive: bool,
    /// If true, a synthetic (credential-less) account may be minted when
    /// the account store has nothing usable left. Spec §4.4.
    pub allow_none_account: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionManagerStatus {
    pub active_sessions: usize,
    pub total_sessions: usize,
    pub disabled_accounts_seen: usize,
}

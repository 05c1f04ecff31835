/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::constants::SESSION_REFRESH_THRESHOLD_SECS;
use crate::utils::clock::elapsed_secs;
use chrono::{DateTime, Utc};
use pretty_simple_display::{DebugPretty, DisplaySimple};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication tokens of a live session
///
/// `security_token` carries the `CST` header and `account_token` the
/// `X-SECURITY-TOKEN` header. The broker expires a session after ten minutes
/// without activity, so validity is measured from `last_used_at`, which every
/// successful call and every ping moves forward.
#[derive(Clone, PartialEq)]
pub struct SessionTokens {
    /// Client authorization token (`CST`)
    pub security_token: String,
    /// Account token (`X-SECURITY-TOKEN`)
    pub account_token: String,
    /// Currently selected financial account
    pub account_id: Option<String>,
    /// When the tokens were issued
    pub issued_at: DateTime<Utc>,
    /// Last time the session was known to be alive
    pub last_used_at: DateTime<Utc>,
}

impl SessionTokens {
    /// Creates a token set issued at `now`
    pub fn new(
        security_token: impl Into<String>,
        account_token: impl Into<String>,
        account_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            security_token: security_token.into(),
            account_token: account_token.into(),
            account_id,
            issued_at: now,
            last_used_at: now,
        }
    }

    /// Seconds since the session was last used
    #[must_use]
    pub fn idle_secs(&self, now: DateTime<Utc>) -> f64 {
        elapsed_secs(self.last_used_at, now)
    }

    /// True once the session has been idle for the refresh threshold
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.idle_secs(now) >= SESSION_REFRESH_THRESHOLD_SECS as f64
    }

    /// Estimated seconds until a refresh is needed
    #[must_use]
    pub fn expires_in_estimate(&self, now: DateTime<Utc>) -> u64 {
        (SESSION_REFRESH_THRESHOLD_SECS as f64 - self.idle_secs(now)).max(0.0) as u64
    }

    /// Token values, for redaction
    #[must_use]
    pub fn secrets(&self) -> Vec<String> {
        vec![self.security_token.clone(), self.account_token.clone()]
    }
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("security_token", &"***")
            .field("account_token", &"***")
            .field("account_id", &self.account_id)
            .field("issued_at", &self.issued_at)
            .field("last_used_at", &self.last_used_at)
            .finish()
    }
}

/// Session status without any token material
#[derive(DebugPretty, DisplaySimple, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStatus {
    /// `demo` or `live`
    pub environment: String,
    /// REST base URL in use
    pub base_url: String,
    /// Whether a token set is held
    pub logged_in: bool,
    /// Currently selected account
    pub account_id: Option<String>,
    /// When the current tokens were issued
    pub issued_at: Option<DateTime<Utc>>,
    /// Last time the session was known to be alive
    pub last_used_at: Option<DateTime<Utc>>,
    /// Seconds until a proactive refresh
    pub expires_in_estimate_secs: Option<u64>,
}

/// Tokens handed out by a successful authentication
#[derive(Clone, PartialEq)]
pub struct LoginGrant {
    /// `CST` response header
    pub security_token: String,
    /// `X-SECURITY-TOKEN` response header
    pub account_token: String,
    /// Account the broker selected
    pub account_id: Option<String>,
}

impl LoginGrant {
    /// Stamps the grant into a token set issued at `now`
    #[must_use]
    pub fn into_tokens(self, now: DateTime<Utc>) -> SessionTokens {
        SessionTokens::new(self.security_token, self.account_token, self.account_id, now)
    }
}

impl fmt::Debug for LoginGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginGrant")
            .field("security_token", &"***")
            .field("account_token", &"***")
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Body of the login response
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Account selected by the broker
    #[serde(default)]
    pub current_account_id: Option<String>,
    /// Client identifier
    #[serde(default)]
    pub client_id: Option<String>,
    /// Streaming endpoint
    #[serde(default)]
    pub streaming_host: Option<String>,
}

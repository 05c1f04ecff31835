/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Error types for the control surface
//!
//! Every fallible operation returns [`AppError`]. The variants map one to one onto
//! the stable wire codes returned by [`AppError::kind`], which is what callers see
//! inside a structured failure result.

use std::fmt;

/// Main error type
#[derive(Debug)]
pub enum AppError {
    /// Authentication was refused by the broker (bad credentials, disabled key)
    Auth(String),
    /// Local rate admission timed out
    RateLimited(String),
    /// The broker or the network failed
    Upstream {
        /// HTTP status code, `None` for network failures
        status: Option<u16>,
        /// Broker error code or transport message
        message: String,
    },
    /// Underlying HTTP client failure
    Network(reqwest::Error),
    /// The preview id is unknown or was already executed
    PreviewNotFound(String),
    /// The preview exists but its time-to-live elapsed
    PreviewExpired(String),
    /// The preview did not pass every risk check
    ChecksFailed(String),
    /// The policy requires `confirm = true`
    ConfirmationRequired,
    /// Dry-run mode blocks every submission
    DryRunBlocked,
    /// Trading is globally disabled
    TradingDisabled,
    /// Malformed request
    Validation(String),
    /// An operation that needs a session was called without one
    NotLoggedIn,
    /// The broker rejected the session tokens of a call
    SessionExpired,
    /// Invalid configuration
    Config(String),
    /// JSON encoding or decoding failure
    Json(serde_json::Error),
}

impl AppError {
    /// Stable error code used in structured results
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "AUTH_FAILED",
            AppError::RateLimited(_) => "RATE_LIMITED",
            AppError::Upstream { .. } | AppError::Network(_) => "UPSTREAM_ERROR",
            AppError::PreviewNotFound(_) => "PREVIEW_NOT_FOUND",
            AppError::PreviewExpired(_) => "PREVIEW_EXPIRED",
            AppError::ChecksFailed(_) => "PREVIEW_CHECKS_FAILED",
            AppError::ConfirmationRequired => "CONFIRM_REQUIRED",
            AppError::DryRunBlocked => "DRY_RUN_ENABLED",
            AppError::TradingDisabled => "TRADING_DISABLED",
            AppError::Validation(_) => "INVALID_REQUEST",
            AppError::NotLoggedIn => "SESSION_NOT_INITIALIZED",
            AppError::SessionExpired => "SESSION_EXPIRED",
            AppError::Config(_) => "CONFIG_INVALID",
            AppError::Json(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether an idempotent call failing with this error may be retried
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::RateLimited(_) => true,
            AppError::Upstream { status, .. } => match status {
                None => true,
                Some(code) => *code >= 500 || *code == 429,
            },
            AppError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Shorthand for an upstream error carrying an HTTP status
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        AppError::Upstream {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Auth(msg) => write!(f, "authentication failed: {msg}"),
            AppError::RateLimited(msg) => write!(f, "rate limited: {msg}"),
            AppError::Upstream {
                status: Some(status),
                message,
            } => write!(f, "upstream error: HTTP {status}: {message}"),
            AppError::Upstream {
                status: None,
                message,
            } => write!(f, "upstream error: {message}"),
            AppError::Network(e) => write!(f, "network error: {e}"),
            AppError::PreviewNotFound(id) => write!(f, "preview {id} not found"),
            AppError::PreviewExpired(id) => write!(f, "preview {id} expired"),
            AppError::ChecksFailed(id) => {
                write!(f, "preview {id} failed risk checks, cannot execute")
            }
            AppError::ConfirmationRequired => {
                write!(f, "explicit confirmation required, set confirm=true")
            }
            AppError::DryRunBlocked => {
                write!(f, "dry-run mode is enabled, all trade executions are blocked")
            }
            AppError::TradingDisabled => write!(f, "trading is disabled"),
            AppError::Validation(msg) => write!(f, "invalid request: {msg}"),
            AppError::NotLoggedIn => write!(f, "not logged in"),
            AppError::SessionExpired => write!(f, "session expired"),
            AppError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            AppError::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Network(e) => Some(e),
            AppError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e)
    }
}

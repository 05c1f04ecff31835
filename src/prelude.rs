/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! # Prelude
//!
//! Commonly used types and traits in one import.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use capital_guard::prelude::*;
//!
//! let client = Client::new(Config::new())?;
//! let status = client.ensure_session().await?;
//! ```

// ============================================================================
// CORE CONFIGURATION AND SETUP
// ============================================================================

/// Configuration types
pub use crate::application::config::{
    BucketConfig, Config, Credentials, Environment, RateLimiterConfig, RestApiConfig, RiskPolicy,
};

/// Library version information
pub use crate::{VERSION, version};

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Main error type for the library
pub use crate::error::AppError;

// ============================================================================
// CLIENT AND COMPONENTS
// ============================================================================

/// Context object
pub use crate::application::client::Client;

/// Session lifecycle
pub use crate::application::auth::SessionManager;

/// Broker calls and confirmation polling
pub use crate::application::gateway::{ConfirmPolling, ConfirmationOutcome, Gateway};

/// Rate admission
pub use crate::application::rate_limiter::{RateLimitSnapshot, RateLimiter, RateTier, TierStatus};

/// Risk engine
pub use crate::application::risk::{DailyCounter, RiskEngine, normalize_size};

// ============================================================================
// CORE SERVICES (TRAITS)
// ============================================================================

/// Account service trait for account reads
pub use crate::application::interfaces::account::AccountService;

/// Market service trait for market data reads
pub use crate::application::interfaces::market::MarketService;

/// Trading service trait for guarded writes
pub use crate::application::interfaces::order::TradingService;

/// Broker transport trait
pub use crate::application::interfaces::transport::Transport;

// ============================================================================
// TRANSPORT
// ============================================================================

/// REST transport over reqwest
pub use crate::model::http::RestTransport;

/// Retry configuration for safe reads
pub use crate::model::retry::RetryConfig;

// ============================================================================
// MODELS
// ============================================================================

/// Session models
pub use crate::model::auth::{LoginGrant, SessionStatus, SessionTokens};

/// Preview models
pub use crate::model::preview::{
    AllowlistSnapshot, PreviewRecord, RiskCheck, RiskPolicySnapshot,
};

/// Request models
pub use crate::model::requests::{
    AccountPreferencesUpdate, HistoryQuery, PriceQuery, TradeRequest, WorkingOrderSpec,
};

/// Response models
pub use crate::model::responses::{DealConfirmation, DealingRules, ExecutionResult, MarketSnapshot};

/// Result envelope
pub use crate::model::result::{ErrorInfo, ResultMeta, ToolResult};

/// Enumerations
pub use crate::presentation::order::{DealStatus, Direction, WorkingOrderType};

// ============================================================================
// UTILITIES
// ============================================================================

/// Time sources
pub use crate::utils::clock::{Clock, ManualClock, SystemClock};

/// Logging utilities
pub use crate::utils::logger::setup_logger;

/// Redaction utilities
pub use crate::utils::redact::{redact_all, redact_text, redact_value};

// ============================================================================
// RE-EXPORTS FROM EXTERNAL CRATES
// ============================================================================

/// Re-export commonly used external types
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;
pub use tracing::{debug, error, info, warn};

/// Re-export chrono for date/time handling
pub use chrono::{DateTime, Utc};

/// Re-export reqwest for custom transports
pub use reqwest::Method;

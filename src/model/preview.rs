/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::model::requests::TradeRequest;
use crate::model::responses::DealingRules;
use chrono::{DateTime, Utc};
use pretty_simple_display::{DebugPretty, DisplaySimple};
use serde::{Deserialize, Serialize};

/// Names of the preview checks, in evaluation order
pub mod check {
    /// Instrument is in the allowlist
    pub const EPIC_ALLOWED: &str = "epic_allowed";
    /// Trading is globally enabled
    pub const TRADING_ENABLED: &str = "trading_enabled";
    /// Normalized position size within the ceiling
    pub const MAX_POSITION_SIZE: &str = "max_position_size";
    /// Normalized working order size within the ceiling
    pub const MAX_WORKING_ORDER_SIZE: &str = "max_working_order_size";
    /// Trades executed today below the ceiling
    pub const DAILY_ORDER_LIMIT: &str = "daily_order_limit";
    /// Open positions below the ceiling
    pub const MAX_OPEN_POSITIONS: &str = "max_open_positions";
    /// Broker dealing rules were fetched
    pub const DEALING_RULES: &str = "dealing_rules";
}

/// One entry of the preview checklist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskCheck {
    /// Check name
    pub name: String,
    /// Outcome
    pub passed: bool,
    /// Human readable explanation
    pub detail: String,
}

impl RiskCheck {
    /// Builds a check from its outcome
    pub fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed,
            detail: detail.into(),
        }
    }
}

/// A validated, normalized trade intent waiting to be executed
///
/// Records are stored by the risk engine and handed back to callers as
/// snapshots; only the engine flips `consumed`.
#[derive(DebugPretty, DisplaySimple, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreviewRecord {
    /// Unique id passed back to execute
    pub preview_id: String,
    /// Request with the normalized size
    pub request: TradeRequest,
    /// Size as originally requested
    pub requested_size: f64,
    /// Checklist in evaluation order
    pub checks: Vec<RiskCheck>,
    /// AND of every check
    pub all_passed: bool,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    /// Instant after which execute is refused
    pub expires_at: DateTime<Utc>,
    /// Set once executed
    pub consumed: bool,
    /// Offer for BUY, bid for SELL, at preview time
    pub estimated_entry: Option<f64>,
    /// Adjustments made while normalizing
    pub size_warnings: Vec<String>,
    /// Rules the size was normalized against
    pub dealing_rules: Option<DealingRules>,
}

impl PreviewRecord {
    /// Expiry is strict: a record is still valid at exactly `expires_at`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Names of the failed checks
    #[must_use]
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Current trading policy and daily usage
#[derive(DebugPretty, DisplaySimple, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskPolicySnapshot {
    /// Master trading switch
    pub allow_trading: bool,
    /// Dry-run mode
    pub dry_run: bool,
    /// Whether execute needs `confirm = true`
    pub require_explicit_confirm: bool,
    /// Position size ceiling
    pub max_position_size: f64,
    /// Working order size ceiling
    pub max_working_order_size: f64,
    /// Open position ceiling
    pub max_open_positions: u32,
    /// Daily trade ceiling
    pub max_orders_per_day: u32,
    /// Trades executed on the current UTC date
    pub orders_today: u32,
    /// Trades left on the current UTC date
    pub orders_remaining_today: u32,
    /// Previews waiting to be executed
    pub pending_previews: usize,
}

/// Instruments the policy admits
#[derive(DebugPretty, DisplaySimple, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllowlistSnapshot {
    /// The `ALL` wildcard is present
    pub allow_all: bool,
    /// Configured entries
    pub epics: Vec<String>,
}

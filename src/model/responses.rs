/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::constants::{DEFAULT_MAX_DEAL_SIZE, DEFAULT_MIN_DEAL_SIZE, DEFAULT_SIZE_INCREMENT};
use crate::presentation::order::{DealStatus, Direction};
use pretty_simple_display::{DebugPretty, DisplaySimple};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-instrument size rules published by the broker
#[derive(DebugPretty, DisplaySimple, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DealingRules {
    /// Smallest accepted size
    pub min_size: f64,
    /// Largest accepted size
    pub max_size: f64,
    /// Size granularity
    pub size_increment: f64,
    /// Smallest stop or profit distance, when published
    pub min_stop_distance: Option<f64>,
}

impl Default for DealingRules {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_DEAL_SIZE,
            max_size: DEFAULT_MAX_DEAL_SIZE,
            size_increment: DEFAULT_SIZE_INCREMENT,
            min_stop_distance: None,
        }
    }
}

fn rule_value(rules: &Value, name: &str) -> Option<f64> {
    rules
        .get(name)
        .and_then(|r| r.get("value"))
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v > 0.0)
}

impl DealingRules {
    /// Reads `dealingRules` from a market details body
    ///
    /// Returns `None` when the body carries no `dealingRules` object. Missing or
    /// non-positive numeric fields fall back to the defaults.
    #[must_use]
    pub fn from_market_details(details: &Value) -> Option<Self> {
        let rules = details.get("dealingRules").filter(|r| r.is_object())?;
        let defaults = Self::default();
        let mut parsed = Self {
            min_size: rule_value(rules, "minDealSize").unwrap_or(defaults.min_size),
            max_size: rule_value(rules, "maxDealSize").unwrap_or(defaults.max_size),
            size_increment: rule_value(rules, "minSizeIncrement")
                .unwrap_or(defaults.size_increment),
            min_stop_distance: rule_value(rules, "minStopOrProfitDistance"),
        };
        if parsed.max_size < parsed.min_size {
            parsed.max_size = parsed.min_size;
        }
        Some(parsed)
    }
}

/// Current quote of an instrument
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    /// Bid price
    pub bid: Option<f64>,
    /// Offer price
    pub offer: Option<f64>,
}

impl MarketSnapshot {
    /// Reads `snapshot` from a market details body
    #[must_use]
    pub fn from_market_details(details: &Value) -> Self {
        let snapshot = details.get("snapshot");
        Self {
            bid: snapshot.and_then(|s| s.get("bid")).and_then(Value::as_f64),
            offer: snapshot.and_then(|s| s.get("offer")).and_then(Value::as_f64),
        }
    }

    /// Price a market order would likely fill at
    #[must_use]
    pub fn entry_for(&self, direction: Direction) -> Option<f64> {
        match direction {
            Direction::Buy => self.offer,
            Direction::Sell => self.bid,
        }
    }
}

/// Number of entries in a `GET /positions` body
///
/// Returns `None` when the body has no `positions` array.
#[must_use]
pub fn count_positions(body: &Value) -> Option<usize> {
    body.get("positions").and_then(Value::as_array).map(Vec::len)
}

/// Deal reference returned by every trade write
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DealReferenceResponse {
    /// Reference used to look up the confirmation
    pub deal_reference: String,
}

impl DealReferenceResponse {
    /// Extracts the reference from a raw write response
    #[must_use]
    pub fn from_value(body: &Value) -> Option<Self> {
        body.get("dealReference")
            .and_then(Value::as_str)
            .map(|r| Self {
                deal_reference: r.to_string(),
            })
    }
}

/// Broker verdict on a submitted deal
#[derive(DebugPretty, DisplaySimple, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DealConfirmation {
    /// Reference the write returned
    #[serde(default)]
    pub deal_reference: String,
    /// ACCEPTED, REJECTED or still pending
    #[serde(default)]
    pub deal_status: DealStatus,
    /// Position or order status (OPEN, DELETED, ...)
    #[serde(default)]
    pub status: Option<String>,
    /// Rejection reason or SUCCESS
    #[serde(default)]
    pub reason: Option<String>,
    /// Deal id of the created or affected deal
    #[serde(default)]
    pub deal_id: Option<String>,
    /// Deals touched by this one
    #[serde(default)]
    pub affected_deals: Vec<Value>,
    /// Fill level
    #[serde(default)]
    pub level: Option<f64>,
    /// Filled size
    #[serde(default)]
    pub size: Option<f64>,
    /// Direction of the deal
    #[serde(default)]
    pub direction: Option<Direction>,
    /// Instrument
    #[serde(default)]
    pub epic: Option<String>,
}

impl DealConfirmation {
    /// Confirmation that has not been answered yet
    pub fn pending(deal_reference: impl Into<String>) -> Self {
        Self {
            deal_reference: deal_reference.into(),
            ..Self::default()
        }
    }

    /// True once the broker accepted or rejected the deal
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.deal_status.is_terminal()
    }
}

/// Outcome of a trade write
#[derive(DebugPretty, DisplaySimple, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    /// Preview consumed by the write, absent for close and cancel
    pub preview_id: Option<String>,
    /// Reference returned by the broker
    pub deal_reference: Option<String>,
    /// Latest known confirmation, when polling was requested
    pub confirmation: Option<DealConfirmation>,
    /// Polling gave up before a terminal status
    pub confirmation_timed_out: bool,
    /// Broker response body
    pub response: Value,
}

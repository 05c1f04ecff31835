/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::error::AppError;
use crate::presentation::order::{Direction, WorkingOrderType};
use pretty_simple_display::DisplaySimple;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Rejects identifiers that would change the request path they are placed in
///
/// # Errors
/// [`AppError::Validation`] for an empty value, a dot segment, whitespace or any
/// of `/ ? # %`
pub fn path_segment<'a>(name: &str, value: &'a str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{name} is required")));
    }
    if value == "."
        || value == ".."
        || value.contains(['/', '?', '#', '%'])
        || value.chars().any(char::is_whitespace)
    {
        return Err(AppError::Validation(format!("{name} contains invalid characters")));
    }
    Ok(value)
}

/// Trigger of a pending order
#[derive(Debug, Clone, DisplaySimple, Serialize, Deserialize, PartialEq)]
pub struct WorkingOrderSpec {
    /// LIMIT or STOP
    #[serde(rename = "type")]
    pub order_type: WorkingOrderType,
    /// Trigger level
    pub level: f64,
    /// Expiry of the order (`YYYY-MM-DDTHH:MM:SS`), good till cancelled when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good_till_date: Option<String>,
}

/// A trade intent, either a new position or a working order
///
/// A request without [`WorkingOrderSpec`] opens a position at market.
#[derive(Debug, Clone, DisplaySimple, Serialize, Deserialize, PartialEq)]
pub struct TradeRequest {
    /// Instrument identifier
    pub epic: String,
    /// BUY or SELL
    pub direction: Direction,
    /// Requested size
    pub size: f64,
    /// Guaranteed stop, exclusive with `trailing_stop`
    #[serde(default)]
    pub guaranteed_stop: bool,
    /// Trailing stop, exclusive with `guaranteed_stop`
    #[serde(default)]
    pub trailing_stop: bool,
    /// Stop loss price level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_level: Option<f64>,
    /// Stop loss distance from entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_distance: Option<f64>,
    /// Stop loss amount in account currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_amount: Option<f64>,
    /// Take profit price level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_level: Option<f64>,
    /// Take profit distance from entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_distance: Option<f64>,
    /// Take profit amount in account currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_amount: Option<f64>,
    /// Present for working orders only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_order: Option<WorkingOrderSpec>,
}

impl TradeRequest {
    /// New position at market
    pub fn position(epic: impl Into<String>, direction: Direction, size: f64) -> Self {
        Self {
            epic: epic.into(),
            direction,
            size,
            guaranteed_stop: false,
            trailing_stop: false,
            stop_level: None,
            stop_distance: None,
            stop_amount: None,
            profit_level: None,
            profit_distance: None,
            profit_amount: None,
            working_order: None,
        }
    }

    /// Pending LIMIT or STOP order at `level`
    pub fn working_order(
        epic: impl Into<String>,
        direction: Direction,
        size: f64,
        order_type: WorkingOrderType,
        level: f64,
    ) -> Self {
        Self {
            working_order: Some(WorkingOrderSpec {
                order_type,
                level,
                good_till_date: None,
            }),
            ..Self::position(epic, direction, size)
        }
    }

    /// Set the stop loss level
    pub fn with_stop_level(mut self, level: f64) -> Self {
        self.stop_level = Some(level);
        self
    }

    /// Set the stop loss distance
    pub fn with_stop_distance(mut self, distance: f64) -> Self {
        self.stop_distance = Some(distance);
        self
    }

    /// Set the stop loss amount
    pub fn with_stop_amount(mut self, amount: f64) -> Self {
        self.stop_amount = Some(amount);
        self
    }

    /// Set the take profit level
    pub fn with_profit_level(mut self, level: f64) -> Self {
        self.profit_level = Some(level);
        self
    }

    /// Set the take profit distance
    pub fn with_profit_distance(mut self, distance: f64) -> Self {
        self.profit_distance = Some(distance);
        self
    }

    /// Set the take profit amount
    pub fn with_profit_amount(mut self, amount: f64) -> Self {
        self.profit_amount = Some(amount);
        self
    }

    /// Request a guaranteed stop
    pub fn with_guaranteed_stop(mut self) -> Self {
        self.guaranteed_stop = true;
        self
    }

    /// Request a trailing stop
    pub fn with_trailing_stop(mut self) -> Self {
        self.trailing_stop = true;
        self
    }

    /// Set the expiry of a working order; ignored for positions
    pub fn with_good_till_date(mut self, date: impl Into<String>) -> Self {
        if let Some(spec) = self.working_order.as_mut() {
            spec.good_till_date = Some(date.into());
        }
        self
    }

    /// True for pending orders
    #[must_use]
    pub fn is_working_order(&self) -> bool {
        self.working_order.is_some()
    }

    /// Copy of the request with a different size
    #[must_use]
    pub fn with_size(&self, size: f64) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }

    /// Structural validation, run before anything touches the network
    ///
    /// # Errors
    /// [`AppError::Validation`] describing the first offending field
    pub fn validate(&self) -> Result<(), AppError> {
        path_segment("epic", &self.epic)?;
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(AppError::Validation(format!(
                "size must be a positive number, got {}",
                self.size
            )));
        }
        if self.guaranteed_stop && self.trailing_stop {
            return Err(AppError::Validation(
                "guaranteed_stop and trailing_stop cannot both be set".to_string(),
            ));
        }
        for (name, value) in [
            ("stop_level", self.stop_level),
            ("stop_distance", self.stop_distance),
            ("stop_amount", self.stop_amount),
            ("profit_level", self.profit_level),
            ("profit_distance", self.profit_distance),
            ("profit_amount", self.profit_amount),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(AppError::Validation(format!(
                        "{name} must be a positive number, got {v}"
                    )));
                }
            }
        }
        if let Some(spec) = &self.working_order {
            if !spec.level.is_finite() || spec.level <= 0.0 {
                return Err(AppError::Validation(format!(
                    "working order level must be a positive number, got {}",
                    spec.level
                )));
            }
            if let Some(date) = &spec.good_till_date {
                if date.trim().is_empty() {
                    return Err(AppError::Validation(
                        "good_till_date must not be empty".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Broker endpoint receiving the create call
    #[must_use]
    pub fn endpoint(&self) -> &'static str {
        if self.is_working_order() {
            "/workingorders"
        } else {
            "/positions"
        }
    }

    /// JSON body of the create call
    ///
    /// # Errors
    /// [`AppError::Json`] if serialization fails
    pub fn to_broker_body(&self) -> Result<Value, AppError> {
        let spec = self.working_order.as_ref();
        let body = BrokerOrderBody {
            epic: self.epic.trim(),
            direction: self.direction,
            size: self.size,
            order_type: spec.map(|s| s.order_type),
            level: spec.map(|s| s.level),
            good_till_date: spec.and_then(|s| s.good_till_date.as_deref()),
            guaranteed_stop: self.guaranteed_stop.then_some(true),
            trailing_stop: self.trailing_stop.then_some(true),
            stop_level: self.stop_level,
            stop_distance: self.stop_distance,
            stop_amount: self.stop_amount,
            profit_level: self.profit_level,
            profit_distance: self.profit_distance,
            profit_amount: self.profit_amount,
        };
        Ok(serde_json::to_value(body)?)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrokerOrderBody<'a> {
    epic: &'a str,
    direction: Direction,
    size: f64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    order_type: Option<WorkingOrderType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    good_till_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guaranteed_stop: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trailing_stop: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profit_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profit_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profit_amount: Option<f64>,
}

/// Candle resolutions accepted by the prices endpoint
pub const PRICE_RESOLUTIONS: [&str; 8] = [
    "MINUTE", "MINUTE_5", "MINUTE_15", "MINUTE_30", "HOUR", "HOUR_4", "DAY", "WEEK",
];

/// Parameters for historical prices
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PriceQuery {
    /// Candle resolution (default: MINUTE_15 on the broker side)
    pub resolution: Option<String>,
    /// Maximum number of candles, 1 to 1000
    pub max: Option<u32>,
    /// Start date time (`YYYY-MM-DDTHH:MM:SS`)
    pub from: Option<String>,
    /// End date time (`YYYY-MM-DDTHH:MM:SS`)
    pub to: Option<String>,
}

impl PriceQuery {
    /// Empty query, broker defaults apply
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resolution
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    /// Set the max number of candles
    pub fn with_max(mut self, max: u32) -> Self {
        self.max = Some(max);
        self
    }

    /// Set the from date
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Set the to date
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Validated query string pairs
    ///
    /// # Errors
    /// [`AppError::Validation`] for an unknown resolution or a max outside 1..=1000
    pub fn to_query(&self) -> Result<Vec<(&'static str, String)>, AppError> {
        let mut query = Vec::new();
        if let Some(resolution) = &self.resolution {
            let resolution = resolution.trim().to_uppercase();
            if !PRICE_RESOLUTIONS.contains(&resolution.as_str()) {
                return Err(AppError::Validation(format!(
                    "unknown resolution '{resolution}'"
                )));
            }
            query.push(("resolution", resolution));
        }
        if let Some(max) = self.max {
            if !(1..=1000).contains(&max) {
                return Err(AppError::Validation(format!(
                    "max must be between 1 and 1000, got {max}"
                )));
            }
            query.push(("max", max.to_string()));
        }
        if let Some(from) = &self.from {
            query.push(("from", from.clone()));
        }
        if let Some(to) = &self.to {
            query.push(("to", to.clone()));
        }
        Ok(query)
    }
}

/// Parameters for activity and transaction history
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct HistoryQuery {
    /// Start date time
    pub from: Option<String>,
    /// End date time
    pub to: Option<String>,
    /// Look-back window in seconds, used when no dates are given
    pub last_period: Option<u64>,
    /// Transaction type filter (transactions only)
    pub transaction_type: Option<String>,
}

impl HistoryQuery {
    /// Empty query, broker defaults apply
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the date range
    pub fn between(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self.to = Some(to.into());
        self
    }

    /// Set the look-back window
    pub fn with_last_period(mut self, seconds: u64) -> Self {
        self.last_period = Some(seconds);
        self
    }

    /// Set the transaction type filter
    pub fn with_transaction_type(mut self, kind: impl Into<String>) -> Self {
        self.transaction_type = Some(kind.into());
        self
    }

    /// Query string pairs
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(from) = &self.from {
            query.push(("from", from.clone()));
        }
        if let Some(to) = &self.to {
            query.push(("to", to.clone()));
        }
        if let Some(last_period) = self.last_period {
            query.push(("lastPeriod", last_period.to_string()));
        }
        if let Some(kind) = &self.transaction_type {
            query.push(("type", kind.clone()));
        }
        query
    }
}

/// Body of the login call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    /// Login identifier
    pub identifier: &'a str,
    /// Account password
    pub password: &'a str,
    /// Always false, the plain password is sent over TLS
    pub encrypted_password: bool,
}

/// Body of the account switch call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchAccountRequest<'a> {
    /// Target financial account
    pub account_id: &'a str,
}

/// Asset classes whose leverage the broker lets the account choose
pub const LEVERAGE_ASSET_CLASSES: [&str; 5] =
    ["SHARES", "CURRENCIES", "INDICES", "CRYPTOCURRENCIES", "COMMODITIES"];

/// Change to the account preferences; unset fields keep their current value
#[derive(Debug, Clone, Default, DisplaySimple, Serialize, Deserialize, PartialEq)]
pub struct AccountPreferencesUpdate {
    /// Hedging mode on or off
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hedging_mode: Option<bool>,
    /// Leverage per asset class; `None` values reset the class to the broker default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leverages: Option<BTreeMap<String, Option<u32>>>,
}

impl AccountPreferencesUpdate {
    /// Update toggling hedging mode only
    #[must_use]
    pub fn hedging(enabled: bool) -> Self {
        Self {
            hedging_mode: Some(enabled),
            ..Self::default()
        }
    }

    /// Adds a leverage for one asset class
    #[must_use]
    pub fn with_leverage(mut self, asset_class: &str, leverage: u32) -> Self {
        self.leverages
            .get_or_insert_with(BTreeMap::new)
            .insert(asset_class.trim().to_uppercase(), Some(leverage));
        self
    }

    /// # Errors
    /// [`AppError::Validation`] for an empty update, an unknown asset class or a
    /// zero leverage
    pub fn validate(&self) -> Result<(), AppError> {
        if self.hedging_mode.is_none() && self.leverages.as_ref().is_none_or(BTreeMap::is_empty) {
            return Err(AppError::Validation(
                "hedging_mode or leverages must be given".to_string(),
            ));
        }
        for (class, leverage) in self.leverages.iter().flatten() {
            let known = LEVERAGE_ASSET_CLASSES
                .iter()
                .any(|c| c.eq_ignore_ascii_case(class.trim()));
            if !known {
                return Err(AppError::Validation(format!(
                    "unknown asset class '{class}', expected one of {}",
                    LEVERAGE_ASSET_CLASSES.join(", ")
                )));
            }
            if *leverage == Some(0) {
                return Err(AppError::Validation(format!(
                    "leverage for {class} must be positive"
                )));
            }
        }
        Ok(())
    }

    /// JSON body of `PUT /accounts/preferences`
    #[must_use]
    pub fn to_broker_body(&self) -> Value {
        let mut body = serde_json::Map::new();
        if let Some(hedging) = self.hedging_mode {
            body.insert("hedgingMode".to_string(), json!(hedging));
        }
        if let Some(leverages) = &self.leverages {
            let leverages: serde_json::Map<String, Value> = leverages
                .iter()
                .map(|(class, leverage)| (class.trim().to_uppercase(), json!(leverage)))
                .collect();
            body.insert("leverages".to_string(), Value::Object(leverages));
        }
        Value::Object(body)
    }
}

/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Risk engine and the two-phase preview/execute protocol
//!
//! A trade is first previewed: validated, normalized against the broker dealing
//! rules and run through the policy checklist. The resulting record can be
//! executed once, within its time-to-live, and only if every check passed.
//! Consumption is a single remove under the preview lock, so concurrent executes
//! of one preview cannot both reach the broker.

use crate::application::config::RiskPolicy;
use crate::application::gateway::{ConfirmPolling, ConfirmationOutcome, Gateway};
use crate::constants::PREVIEW_TTL_SECS;
use crate::error::AppError;
use crate::model::preview::{AllowlistSnapshot, PreviewRecord, RiskCheck, RiskPolicySnapshot, check};
use crate::model::requests::{TradeRequest, path_segment};
use crate::model::responses::{
    DealReferenceResponse, DealingRules, ExecutionResult, MarketSnapshot, count_positions,
};
use crate::utils::clock::Clock;
use crate::utils::id::preview_id;
use chrono::{Duration as ChronoDuration, NaiveDate};
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Absorbs floating point drift in size arithmetic
const SIZE_EPSILON: f64 = 1e-9;

/// Trades executed on one UTC calendar date
///
/// The count resets lazily: the first access on a new date starts from zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCounter {
    date: NaiveDate,
    count: u32,
}

impl DailyCounter {
    /// Empty counter for `today`
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            date: today,
            count: 0,
        }
    }

    fn roll(&mut self, today: NaiveDate) {
        if self.date != today {
            debug!("Daily order counter reset for {today}");
            self.date = today;
            self.count = 0;
        }
    }

    /// Trades executed on `today`
    pub fn count(&mut self, today: NaiveDate) -> u32 {
        self.roll(today);
        self.count
    }

    /// Records one executed trade and returns the new count
    pub fn increment(&mut self, today: NaiveDate) -> u32 {
        self.roll(today);
        self.count = self.count.saturating_add(1);
        self.count
    }
}

/// Number of decimals of a size increment, at most ten
fn increment_decimals(increment: f64) -> i32 {
    let text = format!("{increment}");
    text.split_once('.')
        .map_or(0, |(_, frac)| frac.len().min(10) as i32)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Normalizes a size to the broker dealing rules
///
/// Clamps to `[min_size, max_size]`, rounds half up to the nearest multiple of
/// `size_increment` and clamps again, so the result always lies within the
/// bounds. Every adjustment is reported as a warning.
#[must_use]
pub fn normalize_size(size: f64, rules: &DealingRules) -> (f64, Vec<String>) {
    let min = rules.min_size;
    let max = rules.max_size.max(min);
    let increment = if rules.size_increment > 0.0 {
        rules.size_increment
    } else {
        DealingRules::default().size_increment
    };
    let mut warnings = Vec::new();

    let clamped = size.clamp(min, max);
    if size < min {
        warnings.push(format!("size raised to broker minimum {min}"));
    } else if size > max {
        warnings.push(format!("size lowered to broker maximum {max}"));
    }

    let steps = (clamped / increment + 0.5 + SIZE_EPSILON).floor();
    let normalized = round_to(steps * increment, increment_decimals(increment)).clamp(min, max);
    if (normalized - clamped).abs() > SIZE_EPSILON {
        warnings.push(format!(
            "size rounded from {clamped} to {normalized} (increment {increment})"
        ));
    }
    (normalized, warnings)
}

/// Risk engine for trade validation and the preview cache
pub struct RiskEngine {
    policy: RiskPolicy,
    gateway: Arc<Gateway>,
    clock: Arc<dyn Clock>,
    polling: ConfirmPolling,
    previews: Mutex<HashMap<String, PreviewRecord>>,
    daily: Mutex<DailyCounter>,
}

impl RiskEngine {
    /// Creates an engine with an empty preview cache
    pub fn new(policy: RiskPolicy, gateway: Arc<Gateway>, clock: Arc<dyn Clock>) -> Self {
        let today = clock.now().date_naive();
        Self {
            policy,
            gateway,
            clock,
            polling: ConfirmPolling::default(),
            previews: Mutex::new(HashMap::new()),
            daily: Mutex::new(DailyCounter::new(today)),
        }
    }

    /// Overrides the confirmation polling timing
    #[must_use]
    pub fn with_polling(mut self, polling: ConfirmPolling) -> Self {
        self.polling = polling;
        self
    }

    /// Policy enforced by this engine
    #[must_use]
    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    fn previews(&self) -> MutexGuard<'_, HashMap<String, PreviewRecord>> {
        self.previews.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn daily(&self) -> MutexGuard<'_, DailyCounter> {
        self.daily.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Trades executed on the current UTC date
    pub fn orders_today(&self) -> u32 {
        let today = self.clock.now().date_naive();
        self.daily().count(today)
    }

    /// Validates, normalizes and checks a trade intent, then stores the preview
    ///
    /// The record is returned whether or not every check passed. Previews never
    /// touch the daily counter nor any position.
    ///
    /// # Errors
    /// [`AppError::Validation`] for a malformed request; broker failures only
    /// fail the corresponding check
    pub async fn preview(&self, request: TradeRequest) -> Result<PreviewRecord, AppError> {
        request.validate()?;
        let epic = path_segment("epic", &request.epic)?.to_string();
        let working = request.is_working_order();

        let market = self
            .gateway
            .get(&format!("/markets/{epic}"), &[])
            .await
            .inspect_err(|e| warn!("Market details for {epic} unavailable: {e}"));
        let (rules, snapshot, rules_detail) = match &market {
            Ok(details) => match DealingRules::from_market_details(details) {
                Some(rules) => (
                    Some(rules),
                    MarketSnapshot::from_market_details(details),
                    format!(
                        "min {} / max {} / increment {}",
                        rules.min_size, rules.max_size, rules.size_increment
                    ),
                ),
                None => (
                    None,
                    MarketSnapshot::from_market_details(details),
                    "market details carry no dealing rules".to_string(),
                ),
            },
            Err(e) => (
                None,
                MarketSnapshot::default(),
                format!("dealing rules unavailable: {e}"),
            ),
        };

        let (size, mut size_warnings) = match &rules {
            Some(rules) => normalize_size(request.size, rules),
            None => (request.size, Vec::new()),
        };
        if let Some(min_distance) = rules.and_then(|r| r.min_stop_distance) {
            for (name, distance) in [
                ("stop_distance", request.stop_distance),
                ("profit_distance", request.profit_distance),
            ] {
                if let Some(d) = distance.filter(|d| *d < min_distance) {
                    size_warnings.push(format!(
                        "{name} {d} is below the broker minimum {min_distance}"
                    ));
                }
            }
        }

        let mut checks = Vec::with_capacity(6);

        let allowed = self.policy.is_epic_allowed(&epic);
        checks.push(RiskCheck::new(
            check::EPIC_ALLOWED,
            allowed,
            if allowed {
                format!("{epic} is allowed")
            } else {
                format!("{epic} is not in the allowlist")
            },
        ));

        checks.push(RiskCheck::new(
            check::TRADING_ENABLED,
            self.policy.allow_trading,
            if self.policy.allow_trading {
                "trading is enabled"
            } else {
                "trading is disabled"
            },
        ));

        let (ceiling_name, ceiling) = if working {
            (check::MAX_WORKING_ORDER_SIZE, self.policy.max_working_order_size)
        } else {
            (check::MAX_POSITION_SIZE, self.policy.max_position_size)
        };
        let within = size <= ceiling + SIZE_EPSILON;
        checks.push(RiskCheck::new(
            ceiling_name,
            within,
            if within {
                format!("size {size} within limit {ceiling}")
            } else {
                format!("size {size} exceeds limit {ceiling}")
            },
        ));

        let orders_today = self.orders_today();
        let max_orders = self.policy.max_orders_per_day;
        checks.push(RiskCheck::new(
            check::DAILY_ORDER_LIMIT,
            orders_today < max_orders,
            format!("{orders_today}/{max_orders} orders today"),
        ));

        if !working {
            let max_open = self.policy.max_open_positions;
            let open = self
                .gateway
                .get("/positions", &[])
                .await
                .map(|body| count_positions(&body));
            let open_check = match open {
                Ok(Some(open)) => RiskCheck::new(
                    check::MAX_OPEN_POSITIONS,
                    open < max_open as usize,
                    format!("{open}/{max_open} open positions"),
                ),
                Ok(None) => RiskCheck::new(
                    check::MAX_OPEN_POSITIONS,
                    false,
                    "open positions could not be counted",
                ),
                Err(e) => {
                    warn!("Open positions lookup failed: {e}");
                    RiskCheck::new(
                        check::MAX_OPEN_POSITIONS,
                        false,
                        format!("open positions unavailable: {e}"),
                    )
                }
            };
            checks.push(open_check);
        }

        checks.push(RiskCheck::new(check::DEALING_RULES, rules.is_some(), rules_detail));

        let all_passed = checks.iter().all(|c| c.passed);
        let created_at = self.clock.now();
        let record = PreviewRecord {
            preview_id: preview_id(),
            request: TradeRequest {
                epic,
                ..request.with_size(size)
            },
            requested_size: request.size,
            checks,
            all_passed,
            created_at,
            expires_at: created_at + ChronoDuration::seconds(PREVIEW_TTL_SECS),
            consumed: false,
            estimated_entry: snapshot.entry_for(request.direction),
            size_warnings,
            dealing_rules: rules,
        };

        self.previews()
            .insert(record.preview_id.clone(), record.clone());
        info!(
            "Created preview {} for {} (all checks passed: {})",
            record.preview_id, record.request.epic, record.all_passed
        );
        Ok(record)
    }

    /// Takes a preview out of the cache if every gate passes
    ///
    /// Gates in order: unknown id, expiry (the record is dropped), failed checks,
    /// missing confirmation, dry run. Removal happens under the same lock as the
    /// gates.
    fn consume(&self, id: &str, confirm: bool) -> Result<PreviewRecord, AppError> {
        let now = self.clock.now();
        let mut previews = self.previews();
        let record = match previews.get(id) {
            Some(record) if !record.consumed => record,
            _ => return Err(AppError::PreviewNotFound(id.to_string())),
        };
        if record.is_expired(now) {
            previews.remove(id);
            return Err(AppError::PreviewExpired(id.to_string()));
        }
        if !record.all_passed {
            return Err(AppError::ChecksFailed(id.to_string()));
        }
        if self.policy.require_explicit_confirm && !confirm {
            return Err(AppError::ConfirmationRequired);
        }
        if self.policy.dry_run {
            return Err(AppError::DryRunBlocked);
        }
        let mut record = previews
            .remove(id)
            .ok_or_else(|| AppError::PreviewNotFound(id.to_string()))?;
        record.consumed = true;
        Ok(record)
    }

    /// Executes a preview at most once
    ///
    /// After the gates pass the preview is consumed before any network call; a
    /// write that fails afterwards leaves it consumed. The write is sent once,
    /// without retry. The daily counter moves only on an observed success.
    ///
    /// # Errors
    /// * [`AppError::PreviewNotFound`] - unknown or already executed
    /// * [`AppError::PreviewExpired`] - older than its time-to-live
    /// * [`AppError::ChecksFailed`] - some check did not pass
    /// * [`AppError::ConfirmationRequired`] - `confirm` missing under the policy
    /// * [`AppError::DryRunBlocked`] - dry-run mode
    /// * session, admission and transport errors of the write
    pub async fn execute(
        &self,
        preview_id: &str,
        confirm: bool,
        wait_for_confirm: bool,
    ) -> Result<ExecutionResult, AppError> {
        let record = self.consume(preview_id, confirm)?;
        let body = record.request.to_broker_body()?;
        let response = self
            .gateway
            .write(Method::POST, record.request.endpoint(), Some(&body))
            .await
            .inspect_err(|e| error!("Execution of preview {preview_id} failed: {e}"))?;

        let today = self.clock.now().date_naive();
        let count = self.daily().increment(today);
        info!(
            "Executed preview {preview_id} on {} ({count} orders today)",
            record.request.epic
        );

        self.finish(Some(record.preview_id), response, wait_for_confirm)
            .await
    }

    fn ensure_write_allowed(&self, confirm: bool) -> Result<(), AppError> {
        if !self.policy.allow_trading {
            return Err(AppError::TradingDisabled);
        }
        if self.policy.require_explicit_confirm && !confirm {
            return Err(AppError::ConfirmationRequired);
        }
        if self.policy.dry_run {
            return Err(AppError::DryRunBlocked);
        }
        Ok(())
    }

    /// Closes an open position
    ///
    /// # Errors
    /// [`AppError::TradingDisabled`], [`AppError::ConfirmationRequired`],
    /// [`AppError::DryRunBlocked`] in that order, then transport errors
    pub async fn close_position(
        &self,
        deal_id: &str,
        confirm: bool,
        wait_for_confirm: bool,
    ) -> Result<ExecutionResult, AppError> {
        self.delete_deal("/positions", deal_id, confirm, wait_for_confirm)
            .await
    }

    /// Cancels a working order
    ///
    /// # Errors
    /// Same as [`RiskEngine::close_position`]
    pub async fn cancel_working_order(
        &self,
        deal_id: &str,
        confirm: bool,
        wait_for_confirm: bool,
    ) -> Result<ExecutionResult, AppError> {
        self.delete_deal("/workingorders", deal_id, confirm, wait_for_confirm)
            .await
    }

    async fn delete_deal(
        &self,
        collection: &str,
        deal_id: &str,
        confirm: bool,
        wait_for_confirm: bool,
    ) -> Result<ExecutionResult, AppError> {
        self.ensure_write_allowed(confirm)?;
        let deal_id = path_segment("deal id", deal_id)?;
        let response = self
            .gateway
            .write(Method::DELETE, &format!("{collection}/{deal_id}"), None)
            .await
            .inspect_err(|e| error!("DELETE {collection}/{deal_id} failed: {e}"))?;
        self.finish(None, response, wait_for_confirm).await
    }

    /// Account-level write behind the trading gates, sent once
    ///
    /// Not counted toward the daily order limit.
    ///
    /// # Errors
    /// Same as [`RiskEngine::close_position`]
    pub async fn guarded_write(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        confirm: bool,
    ) -> Result<Value, AppError> {
        self.ensure_write_allowed(confirm)?;
        let label = format!("{method} {path}");
        self.gateway
            .write(method, path, Some(body))
            .await
            .inspect_err(|e| error!("{label} failed: {e}"))
    }

    async fn finish(
        &self,
        preview_id: Option<String>,
        response: Value,
        wait_for_confirm: bool,
    ) -> Result<ExecutionResult, AppError> {
        let deal_reference =
            DealReferenceResponse::from_value(&response).map(|r| r.deal_reference);
        let mut result = ExecutionResult {
            preview_id,
            deal_reference: deal_reference.clone(),
            confirmation: None,
            confirmation_timed_out: false,
            response,
        };
        match (wait_for_confirm, deal_reference) {
            (true, Some(reference)) => {
                let outcome = self.wait_for_confirmation(&reference, None).await;
                result.confirmation = Some(outcome.confirmation);
                result.confirmation_timed_out = outcome.timed_out;
            }
            (true, None) => warn!("Broker response carries no deal reference to confirm"),
            (false, _) => {}
        }
        Ok(result)
    }

    /// Polls a deal confirmation, bounded by `max_wait` or the default wait
    pub async fn wait_for_confirmation(
        &self,
        deal_reference: &str,
        max_wait: Option<Duration>,
    ) -> ConfirmationOutcome {
        let polling = ConfirmPolling {
            max_wait: max_wait.unwrap_or(self.polling.max_wait),
            ..self.polling
        };
        self.gateway
            .wait_for_confirmation(deal_reference, polling)
            .await
    }

    /// Policy and daily usage
    pub fn policy_snapshot(&self) -> RiskPolicySnapshot {
        let now = self.clock.now();
        let orders_today = self.daily().count(now.date_naive());
        let pending_previews = {
            let mut previews = self.previews();
            previews.retain(|_, record| !record.is_expired(now));
            previews.len()
        };
        RiskPolicySnapshot {
            allow_trading: self.policy.allow_trading,
            dry_run: self.policy.dry_run,
            require_explicit_confirm: self.policy.require_explicit_confirm,
            max_position_size: self.policy.max_position_size,
            max_working_order_size: self.policy.max_working_order_size,
            max_open_positions: self.policy.max_open_positions,
            max_orders_per_day: self.policy.max_orders_per_day,
            orders_today,
            orders_remaining_today: self.policy.max_orders_per_day.saturating_sub(orders_today),
            pending_previews,
        }
    }

    /// Configured allowlist
    #[must_use]
    pub fn allowlist_snapshot(&self) -> AllowlistSnapshot {
        AllowlistSnapshot {
            allow_all: self.policy.allows_all(),
            epics: self.policy.allowed_epics.clone(),
        }
    }
}

impl std::fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskEngine")
            .field("policy", &self.policy)
            .field("polling", &self.polling)
            .finish()
    }
}

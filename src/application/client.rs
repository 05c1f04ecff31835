/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::application::auth::SessionManager;
use crate::application::config::{Config, Environment};
use crate::application::gateway::{ConfirmationOutcome, Gateway};
use crate::application::interfaces::account::AccountService;
use crate::application::interfaces::market::MarketService;
use crate::application::interfaces::order::TradingService;
use crate::application::interfaces::transport::Transport;
use crate::application::rate_limiter::{RateLimitSnapshot, RateLimiter};
use crate::application::risk::RiskEngine;
use crate::error::AppError;
use crate::model::auth::SessionStatus;
use crate::model::http::RestTransport;
use crate::model::preview::{AllowlistSnapshot, PreviewRecord, RiskPolicySnapshot};
use crate::model::requests::{
    AccountPreferencesUpdate, HistoryQuery, PriceQuery, TradeRequest, path_segment,
};
use crate::model::responses::{DealConfirmation, ExecutionResult};
use crate::model::result::ToolResult;
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::redact::{redact_all, redact_text};
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Control surface over one Capital.com account
///
/// Owns one session manager, one rate limiter and one risk engine. Instances are
/// independent, so a demo and a live client can coexist in one process. Cloning
/// is cheap and shares the state.
#[derive(Clone)]
pub struct Client {
    config: Arc<Config>,
    rate_limiter: Arc<RateLimiter>,
    session: Arc<SessionManager>,
    gateway: Arc<Gateway>,
    risk: Arc<RiskEngine>,
}

impl Client {
    /// Creates a client over the REST API with the system clock
    ///
    /// No network call is made; the first operation logs in.
    ///
    /// # Errors
    /// [`AppError::Config`] for an invalid configuration
    pub fn new(config: Config) -> Result<Self, AppError> {
        config.validate()?;
        let transport = Arc::new(RestTransport::new(&config)?);
        Self::with_transport(config, transport, Arc::new(SystemClock))
    }

    /// Creates a client over any transport and clock
    ///
    /// # Errors
    /// [`AppError::Config`] for an invalid configuration
    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        config.validate()?;
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limiter, clock.clone()));
        let session = Arc::new(SessionManager::new(
            &config,
            transport.clone(),
            rate_limiter.clone(),
            clock.clone(),
        ));
        let gateway = Arc::new(Gateway::new(
            session.clone(),
            rate_limiter.clone(),
            transport,
            clock.clone(),
            config.retry.clone(),
        ));
        let risk = Arc::new(RiskEngine::new(config.risk.clone(), gateway.clone(), clock));
        info!(
            "Client ready for {} ({}), trading {}, dry run {}",
            config.environment,
            config.rest_api.base_url,
            if config.risk.allow_trading { "enabled" } else { "disabled" },
            config.risk.dry_run
        );
        Ok(Self {
            config: Arc::new(config),
            rate_limiter,
            session,
            gateway,
            risk,
        })
    }

    /// Configuration of this instance
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Makes sure a valid session exists, logging in if needed
    pub async fn ensure_session(&self) -> Result<SessionStatus, AppError> {
        self.session.ensure_valid_session().await?;
        Ok(self.session.status().await)
    }

    /// Forces a new login, then selects `account_id` or the configured default
    pub async fn login(&self, account_id: Option<&str>) -> Result<SessionStatus, AppError> {
        self.session.login_with_account(account_id).await?;
        Ok(self.session.status().await)
    }

    /// Keeps the session alive
    pub async fn ping(&self) -> Result<SessionStatus, AppError> {
        self.session.ping().await
    }

    /// Selects another financial account
    pub async fn switch_account(&self, account_id: &str) -> Result<SessionStatus, AppError> {
        self.session.switch_account(account_id).await
    }

    /// Ends the session
    pub async fn logout(&self) -> Result<(), AppError> {
        self.session.logout().await
    }

    /// Session status without token material
    pub async fn session_status(&self) -> SessionStatus {
        self.session.status().await
    }

    /// Trading policy and daily usage
    pub fn risk_policy_snapshot(&self) -> RiskPolicySnapshot {
        self.risk.policy_snapshot()
    }

    /// Instruments the policy admits
    #[must_use]
    pub fn allowlist_snapshot(&self) -> AllowlistSnapshot {
        self.risk.allowlist_snapshot()
    }

    /// Current rate admission capacity
    #[must_use]
    pub fn rate_limit_snapshot(&self) -> RateLimitSnapshot {
        self.rate_limiter.snapshot()
    }

    /// Previews a new position
    pub async fn preview_position(&self, request: TradeRequest) -> Result<PreviewRecord, AppError> {
        if request.is_working_order() {
            return Err(AppError::Validation(
                "working order given to preview_position".to_string(),
            ));
        }
        self.risk.preview(request).await
    }

    /// Previews a working order
    pub async fn preview_working_order(
        &self,
        request: TradeRequest,
    ) -> Result<PreviewRecord, AppError> {
        if !request.is_working_order() {
            return Err(AppError::Validation(
                "working order trigger missing".to_string(),
            ));
        }
        self.risk.preview(request).await
    }

    /// Tears the instance down, ending the broker session
    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down client");
        self.session.logout().await
    }

    /// Converts an operation result into the uniform envelope
    ///
    /// Secret-named fields are masked and every credential or token value is
    /// replaced, in data and in error messages alike.
    pub async fn respond<T: Serialize>(&self, result: Result<T, AppError>) -> ToolResult {
        let secrets = self.session.secrets().await;
        match result.and_then(|data| serde_json::to_value(&data).map_err(AppError::from)) {
            Ok(data) => ToolResult::success(redact_all(&data, &secrets)),
            Err(e) => {
                debug!("Operation failed: {}", e.kind());
                ToolResult::failure(e.kind(), redact_text(&e.to_string(), &secrets))
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("environment", &self.config.environment)
            .field("session", &self.session)
            .field("risk", &self.risk)
            .finish()
    }
}

#[async_trait]
impl TradingService for Client {
    async fn preview(&self, request: TradeRequest) -> Result<PreviewRecord, AppError> {
        self.risk.preview(request).await
    }

    async fn execute(
        &self,
        preview_id: &str,
        confirm: bool,
        wait_for_confirm: bool,
    ) -> Result<ExecutionResult, AppError> {
        self.risk
            .execute(preview_id.trim(), confirm, wait_for_confirm)
            .await
    }

    async fn close_position(
        &self,
        deal_id: &str,
        confirm: bool,
        wait_for_confirm: bool,
    ) -> Result<ExecutionResult, AppError> {
        let deal_id = path_segment("deal id", deal_id)?;
        self.risk
            .close_position(deal_id, confirm, wait_for_confirm)
            .await
    }

    async fn cancel_working_order(
        &self,
        deal_id: &str,
        confirm: bool,
        wait_for_confirm: bool,
    ) -> Result<ExecutionResult, AppError> {
        let deal_id = path_segment("deal id", deal_id)?;
        self.risk
            .cancel_working_order(deal_id, confirm, wait_for_confirm)
            .await
    }

    async fn wait_for_confirmation(
        &self,
        deal_reference: &str,
        timeout: Option<Duration>,
    ) -> Result<ConfirmationOutcome, AppError> {
        let deal_reference = path_segment("deal reference", deal_reference)?;
        Ok(self
            .risk
            .wait_for_confirmation(deal_reference, timeout)
            .await)
    }
}

#[async_trait]
impl MarketService for Client {
    async fn search_markets(
        &self,
        search_term: Option<&str>,
        epics: &[String],
    ) -> Result<Value, AppError> {
        let mut query = Vec::new();
        if let Some(term) = search_term.map(str::trim).filter(|t| !t.is_empty()) {
            query.push(("searchTerm", term.to_string()));
        }
        if !epics.is_empty() {
            query.push(("epics", epics.join(",")));
        }
        if query.is_empty() {
            return Err(AppError::Validation(
                "a search term or a list of epics is required".to_string(),
            ));
        }
        debug!("Searching markets: {:?}", query);
        self.gateway.get("/markets", &query).await
    }

    async fn get_market_details(&self, epic: &str) -> Result<Value, AppError> {
        let epic = path_segment("epic", epic)?;
        self.gateway.get(&format!("/markets/{epic}"), &[]).await
    }

    async fn get_prices(&self, epic: &str, query: &PriceQuery) -> Result<Value, AppError> {
        let epic = path_segment("epic", epic)?;
        let query = query.to_query()?;
        self.gateway.get(&format!("/prices/{epic}"), &query).await
    }

    async fn get_market_navigation(&self) -> Result<Value, AppError> {
        self.gateway.get("/marketnavigation", &[]).await
    }

    async fn get_market_navigation_node(
        &self,
        node_id: &str,
        limit: Option<u32>,
    ) -> Result<Value, AppError> {
        let node_id = path_segment("node id", node_id)?;
        let query: Vec<(&str, String)> = limit.map(|l| ("limit", l.to_string())).into_iter().collect();
        self.gateway
            .get(&format!("/marketnavigation/{node_id}"), &query)
            .await
    }

    async fn get_client_sentiment(&self, market_ids: &[String]) -> Result<Value, AppError> {
        match market_ids {
            [] => Err(AppError::Validation("at least one market id is required".to_string())),
            [single] => {
                let id = path_segment("market id", single)?;
                self.gateway.get(&format!("/clientsentiment/{id}"), &[]).await
            }
            many => {
                let query = [("marketIds", many.join(","))];
                self.gateway.get("/clientsentiment", &query).await
            }
        }
    }
}

#[async_trait]
impl AccountService for Client {
    async fn get_accounts(&self) -> Result<Value, AppError> {
        self.gateway.get("/accounts", &[]).await
    }

    async fn get_account_preferences(&self) -> Result<Value, AppError> {
        self.gateway.get("/accounts/preferences", &[]).await
    }

    async fn get_activity(&self, query: &HistoryQuery) -> Result<Value, AppError> {
        self.gateway.get("/history/activity", &query.to_query()).await
    }

    async fn get_transactions(&self, query: &HistoryQuery) -> Result<Value, AppError> {
        self.gateway
            .get("/history/transactions", &query.to_query())
            .await
    }

    async fn get_positions(&self) -> Result<Value, AppError> {
        self.gateway.get("/positions", &[]).await
    }

    async fn get_position(&self, deal_id: &str) -> Result<Value, AppError> {
        let deal_id = path_segment("deal id", deal_id)?;
        self.gateway.get(&format!("/positions/{deal_id}"), &[]).await
    }

    async fn get_working_orders(&self) -> Result<Value, AppError> {
        self.gateway.get("/workingorders", &[]).await
    }

    async fn get_deal_confirmation(
        &self,
        deal_reference: &str,
    ) -> Result<DealConfirmation, AppError> {
        let deal_reference = path_segment("deal reference", deal_reference)?;
        self.gateway.confirmation(deal_reference).await
    }

    async fn update_account_preferences(
        &self,
        update: &AccountPreferencesUpdate,
        confirm: bool,
    ) -> Result<Value, AppError> {
        update.validate()?;
        info!("Updating account preferences");
        self.risk
            .guarded_write(
                Method::PUT,
                "/accounts/preferences",
                &update.to_broker_body(),
                confirm,
            )
            .await
    }

    async fn top_up_demo_account(&self, amount: f64, confirm: bool) -> Result<Value, AppError> {
        if self.config.environment != Environment::Demo {
            return Err(AppError::Validation(
                "top-up is only available in the demo environment".to_string(),
            ));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AppError::Validation(format!(
                "amount must be a positive number, got {amount}"
            )));
        }
        info!("Topping up demo account by {amount}");
        self.risk
            .guarded_write(Method::POST, "/accounts/topUp", &json!({"amount": amount}), confirm)
            .await
    }
}

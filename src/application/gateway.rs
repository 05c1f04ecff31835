/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Session-bearing, rate-admitted calls to the broker
//!
//! Reads go through the global tier, are retried with exponential backoff on
//! transient failures and survive one session rejection by logging in again.
//! Writes go through the trading tier and are sent exactly once.

use crate::application::auth::SessionManager;
use crate::application::interfaces::transport::Transport;
use crate::application::rate_limiter::{RateLimiter, RateTier};
use crate::constants::{CONFIRM_INITIAL_DELAY_MS, CONFIRM_MAX_WAIT_SECS, CONFIRM_POLL_INTERVAL_MS};
use crate::error::AppError;
use crate::model::responses::DealConfirmation;
use crate::model::retry::RetryConfig;
use crate::utils::clock::{Clock, elapsed_secs};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timing of confirmation polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPolling {
    /// Delay before the first lookup
    pub initial_delay: Duration,
    /// Delay between lookups
    pub interval: Duration,
    /// Total time after which polling gives up
    pub max_wait: Duration,
}

impl Default for ConfirmPolling {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(CONFIRM_INITIAL_DELAY_MS),
            interval: Duration::from_millis(CONFIRM_POLL_INTERVAL_MS),
            max_wait: Duration::from_secs(CONFIRM_MAX_WAIT_SECS),
        }
    }
}

/// Last known confirmation and whether polling ran out of time
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationOutcome {
    /// Latest answer, pending if the broker never answered
    pub confirmation: DealConfirmation,
    /// No terminal status within the wait
    pub timed_out: bool,
}

/// Gateway composing the session, the rate limiter and the transport
pub struct Gateway {
    session: Arc<SessionManager>,
    rate_limiter: Arc<RateLimiter>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    retry: RetryConfig,
}

impl Gateway {
    /// Creates a gateway over shared components
    pub fn new(
        session: Arc<SessionManager>,
        rate_limiter: Arc<RateLimiter>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            session,
            rate_limiter,
            transport,
            clock,
            retry,
        }
    }

    /// Session manager behind this gateway
    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    async fn admit(&self, tier: RateTier) -> Result<(), AppError> {
        self.rate_limiter
            .acquire(tier, self.rate_limiter.default_timeout())
            .await
    }

    /// Safe read
    ///
    /// Transient failures are retried up to the configured attempt count with
    /// exponential backoff; a rejected session triggers one login and one more
    /// attempt. Every attempt is rate admitted.
    ///
    /// # Errors
    /// The last error once attempts are exhausted or on a non-retryable failure
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, AppError> {
        let max_attempts = self.retry.max_retries();
        let mut attempt = 0u32;
        let mut relogged = false;
        let mut tokens = self.session.ensure_valid_session().await?;

        loop {
            self.admit(RateTier::Global).await?;
            match self
                .transport
                .request(Method::GET, path, query, None, &tokens)
                .await
            {
                Ok(body) => {
                    self.session.touch();
                    return Ok(body);
                }
                Err(AppError::SessionExpired) if !relogged => {
                    relogged = true;
                    tokens = self.session.refresh_after_rejection(&tokens).await?;
                }
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    attempt += 1;
                    warn!(
                        "GET {path} failed (attempt {attempt}/{max_attempts}): {e}, retrying in {:?}",
                        delay
                    );
                    self.clock.sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Non-idempotent write through the trading tier, sent exactly once
    ///
    /// # Errors
    /// Any session, admission or transport error; nothing is retried
    pub async fn write(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, AppError> {
        let tokens = self.session.ensure_valid_session().await?;
        self.admit(RateTier::Trading).await?;
        info!("{method} {path}");
        let response = self
            .transport
            .request(method, path, &[], body, &tokens)
            .await?;
        self.session.touch();
        Ok(response)
    }

    /// Single confirmation lookup
    ///
    /// # Errors
    /// Any session, admission or transport error
    pub async fn confirmation(&self, deal_reference: &str) -> Result<DealConfirmation, AppError> {
        let tokens = self.session.ensure_valid_session().await?;
        self.admit(RateTier::Global).await?;
        let confirmation = self.transport.confirmation(deal_reference, &tokens).await?;
        self.session.touch();
        Ok(confirmation)
    }

    /// Polls the confirmation until the broker accepts or rejects the deal
    ///
    /// Lookup errors are logged and polling continues. When `polling.max_wait`
    /// elapses the last known, possibly pending, confirmation is returned with
    /// `timed_out` set.
    pub async fn wait_for_confirmation(
        &self,
        deal_reference: &str,
        polling: ConfirmPolling,
    ) -> ConfirmationOutcome {
        let start = self.clock.now();
        let max_wait = polling.max_wait.as_secs_f64();
        let mut last = DealConfirmation::pending(deal_reference);

        self.clock
            .sleep(polling.initial_delay.min(polling.max_wait))
            .await;
        loop {
            match self.confirmation(deal_reference).await {
                Ok(confirmation) if confirmation.is_terminal() => {
                    info!("Deal {deal_reference} {:?}", confirmation.deal_status);
                    return ConfirmationOutcome {
                        confirmation,
                        timed_out: false,
                    };
                }
                Ok(confirmation) => last = confirmation,
                Err(e) => debug!("Confirmation lookup for {deal_reference} failed: {e}"),
            }

            let elapsed = elapsed_secs(start, self.clock.now());
            if elapsed >= max_wait {
                warn!("No final confirmation for {deal_reference} after {elapsed:.1}s");
                return ConfirmationOutcome {
                    confirmation: last,
                    timed_out: true,
                };
            }
            let remaining = Duration::from_secs_f64(max_wait - elapsed);
            self.clock.sleep(polling.interval.min(remaining)).await;
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("session", &self.session)
            .field("retry", &self.retry)
            .finish()
    }
}

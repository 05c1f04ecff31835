/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Session lifecycle for the Capital.com API
//!
//! This module owns the single token set of an instance and handles:
//! - Login, with the session rate tier and the optional account switch
//! - Proactive refresh before the broker's inactivity expiry
//! - Account switching, keep-alive and logout
//!
//! The state lock is held across the login exchange and nothing else, so callers
//! that arrive during a login wait for it and reuse its tokens.

use crate::application::config::{Config, Credentials, Environment};
use crate::application::interfaces::transport::Transport;
use crate::application::rate_limiter::{RateLimiter, RateTier};
use crate::error::AppError;
use crate::model::auth::{SessionStatus, SessionTokens};
use crate::utils::clock::Clock;
use std::sync::Arc;
use chrono::DateTime;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Session manager for the Capital.com API
pub struct SessionManager {
    credentials: Credentials,
    environment: Environment,
    base_url: String,
    default_account_id: Option<String>,
    transport: Arc<dyn Transport>,
    rate_limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    tokens: Mutex<Option<SessionTokens>>,
    /// Bumped on every token replacement
    generation: AtomicU64,
    /// Latest successful use, in epoch milliseconds; folded into the tokens
    /// under the lock
    last_touch_ms: AtomicI64,
}

impl SessionManager {
    /// Creates a manager with no session
    ///
    /// # Arguments
    /// * `config` - Credentials, environment and default account
    /// * `transport` - Broker boundary
    /// * `rate_limiter` - Shared admission control
    /// * `clock` - Time source for session age
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        rate_limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials: config.credentials.clone(),
            environment: config.environment,
            base_url: config.rest_api.base_url.clone(),
            default_account_id: config.default_account_id.clone(),
            transport,
            rate_limiter,
            clock,
            tokens: Mutex::new(None),
            generation: AtomicU64::new(0),
            last_touch_ms: AtomicI64::new(i64::MIN),
        }
    }

    /// Returns tokens that are safe to use, logging in when there are none or
    /// when they have been idle past the refresh threshold
    ///
    /// # Errors
    /// Any error of [`SessionManager::login`]
    pub async fn ensure_valid_session(&self) -> Result<SessionTokens, AppError> {
        let mut guard = self.tokens.lock().await;
        if let Some(tokens) = guard.as_mut() {
            self.apply_touch(tokens);
            if !tokens.needs_refresh(self.clock.now()) {
                return Ok(tokens.clone());
            }
            info!("Session idle past the refresh threshold, logging in again");
        } else {
            info!("No active session, logging in");
        }
        self.login_locked(&mut guard, None).await
    }

    /// Forces a new authentication
    ///
    /// A caller that waited behind another login reuses its result.
    ///
    /// # Errors
    /// * [`AppError::Auth`] - credentials refused, never retried
    /// * [`AppError::RateLimited`] - no session capacity within the timeout
    /// * [`AppError::Upstream`] / [`AppError::Network`] - broker unreachable
    ///
    /// Prior tokens are left untouched on every error.
    pub async fn login(&self) -> Result<SessionTokens, AppError> {
        self.login_with_account(None).await
    }

    /// Forces a new authentication, then selects `account_id`, or the
    /// configured default account when `None`
    ///
    /// A concurrent login is reused only if it left the requested account
    /// selected.
    ///
    /// # Errors
    /// [`AppError::Validation`] for a blank account id; otherwise as
    /// [`SessionManager::login`], including a failed account switch
    pub async fn login_with_account(
        &self,
        account_id: Option<&str>,
    ) -> Result<SessionTokens, AppError> {
        let account_id = account_id.map(str::trim);
        if account_id == Some("") {
            return Err(AppError::Validation("account id is required".to_string()));
        }
        let seen = self.generation.load(Ordering::Acquire);
        let mut guard = self.tokens.lock().await;
        if self.generation.load(Ordering::Acquire) != seen {
            if let Some(tokens) = guard.as_ref() {
                if account_id.is_none_or(|id| tokens.account_id.as_deref() == Some(id)) {
                    debug!("Reusing session from a concurrent login");
                    return Ok(tokens.clone());
                }
            }
        }
        self.login_locked(&mut guard, account_id).await
    }

    /// Logs in again unless `stale` has already been replaced
    ///
    /// Used after the broker rejected `stale`, so that concurrent callers holding
    /// the same rejected tokens trigger one login between them.
    pub(crate) async fn refresh_after_rejection(
        &self,
        stale: &SessionTokens,
    ) -> Result<SessionTokens, AppError> {
        let mut guard = self.tokens.lock().await;
        if let Some(current) = guard.as_ref() {
            if current.security_token != stale.security_token {
                return Ok(current.clone());
            }
        }
        warn!("Session rejected by the broker, logging in again");
        self.login_locked(&mut guard, None).await
    }

    async fn login_locked(
        &self,
        guard: &mut MutexGuard<'_, Option<SessionTokens>>,
        account_id: Option<&str>,
    ) -> Result<SessionTokens, AppError> {
        self.rate_limiter
            .acquire(RateTier::Session, self.rate_limiter.default_timeout())
            .await?;

        debug!("Logging in to {} as {}", self.base_url, self.credentials.identifier);
        let grant = self
            .transport
            .authenticate(&self.credentials)
            .await
            .inspect_err(|e| error!("Login failed: {e}"))?;
        let mut tokens = grant.into_tokens(self.clock.now());

        if let Some(target) = account_id.or(self.default_account_id.as_deref()) {
            if tokens.account_id.as_deref() != Some(target) {
                self.rate_limiter
                    .acquire(RateTier::Global, self.rate_limiter.default_timeout())
                    .await?;
                self.transport
                    .switch_account(target, &tokens)
                    .await
                    .inspect_err(|e| error!("Switch to account {target} after login failed: {e}"))?;
                tokens.account_id = Some(target.to_string());
                tokens.last_used_at = self.clock.now();
            }
        }

        **guard = Some(tokens.clone());
        self.generation.fetch_add(1, Ordering::AcqRel);
        info!(
            "Login successful, account: {}",
            tokens.account_id.as_deref().unwrap_or("-")
        );
        Ok(tokens)
    }

    /// Current tokens without any refresh
    ///
    /// # Errors
    /// [`AppError::NotLoggedIn`] when there is no session
    pub async fn current_tokens(&self) -> Result<SessionTokens, AppError> {
        self.tokens.lock().await.clone().ok_or(AppError::NotLoggedIn)
    }

    /// Keeps the session alive without rotating tokens
    ///
    /// # Errors
    /// [`AppError::NotLoggedIn`] without a session; transport errors otherwise
    pub async fn ping(&self) -> Result<SessionStatus, AppError> {
        let tokens = self.current_tokens().await?;
        self.rate_limiter
            .acquire(RateTier::Global, self.rate_limiter.default_timeout())
            .await?;
        self.transport.ping(&tokens).await?;
        self.touch();
        debug!("Session ping ok");
        Ok(self.status().await)
    }

    /// Selects another financial account for the current session
    ///
    /// The broker call is made outside the lock; the account id is then stored
    /// only if the token set it was made with is still the current one.
    ///
    /// # Errors
    /// * [`AppError::Validation`] - empty account id
    /// * [`AppError::NotLoggedIn`] - no session
    /// * [`AppError::SessionExpired`] - the session was replaced during the call
    pub async fn switch_account(&self, account_id: &str) -> Result<SessionStatus, AppError> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(AppError::Validation("account id is required".to_string()));
        }
        let tokens = self.current_tokens().await?;
        if tokens.account_id.as_deref() == Some(account_id) {
            debug!("Account {account_id} already selected");
            return Ok(self.status().await);
        }
        self.rate_limiter
            .acquire(RateTier::Global, self.rate_limiter.default_timeout())
            .await?;
        self.transport.switch_account(account_id, &tokens).await?;

        {
            let mut guard = self.tokens.lock().await;
            match guard.as_mut() {
                Some(current) if current.security_token == tokens.security_token => {
                    current.account_id = Some(account_id.to_string());
                    current.last_used_at = self.clock.now();
                }
                _ => {
                    warn!("Session replaced while switching to {account_id}");
                    return Err(AppError::SessionExpired);
                }
            }
        }
        info!("Switched to account {account_id}");
        Ok(self.status().await)
    }

    /// Clears the session
    ///
    /// The remote session delete is best effort; local tokens are gone either way.
    pub async fn logout(&self) -> Result<(), AppError> {
        let previous = {
            let mut guard = self.tokens.lock().await;
            let previous = guard.take();
            if previous.is_some() {
                self.generation.fetch_add(1, Ordering::AcqRel);
            }
            previous
        };
        let Some(tokens) = previous else {
            debug!("Logout without a session");
            return Ok(());
        };

        if !self.rate_limiter.try_acquire(RateTier::Global) {
            warn!("No rate capacity for the remote logout, session dropped locally");
        } else if let Err(e) = self.transport.logout(&tokens).await {
            warn!("Remote logout failed, session dropped locally: {e}");
        }
        info!("Logged out");
        Ok(())
    }

    /// Marks the session as used now
    ///
    /// Never waits for the state lock; the mark is applied the next time the
    /// tokens are read.
    pub fn touch(&self) {
        let now = self.clock.now().timestamp_millis();
        self.last_touch_ms.fetch_max(now, Ordering::AcqRel);
    }

    fn apply_touch(&self, tokens: &mut SessionTokens) {
        let touched = DateTime::from_timestamp_millis(self.last_touch_ms.load(Ordering::Acquire));
        if let Some(touched) = touched.filter(|t| *t > tokens.last_used_at) {
            tokens.last_used_at = touched;
        }
    }

    /// Session status without token material
    pub async fn status(&self) -> SessionStatus {
        let now = self.clock.now();
        let mut guard = self.tokens.lock().await;
        if let Some(tokens) = guard.as_mut() {
            self.apply_touch(tokens);
        }
        let tokens = guard.as_ref();
        SessionStatus {
            environment: self.environment.to_string(),
            base_url: self.base_url.clone(),
            logged_in: tokens.is_some(),
            account_id: tokens.and_then(|t| t.account_id.clone()),
            issued_at: tokens.map(|t| t.issued_at),
            last_used_at: tokens.map(|t| t.last_used_at),
            expires_in_estimate_secs: tokens.map(|t| t.expires_in_estimate(now)),
        }
    }

    /// Values that must be masked in anything leaving the process
    pub async fn secrets(&self) -> Vec<String> {
        let mut secrets = self.credentials.secrets();
        if let Some(tokens) = self.tokens.lock().await.as_ref() {
            secrets.extend(tokens.secrets());
        }
        secrets
    }

    /// Credentials secrets only, available without waiting for the lock
    #[must_use]
    pub fn credential_secrets(&self) -> Vec<String> {
        self.credentials.secrets()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}

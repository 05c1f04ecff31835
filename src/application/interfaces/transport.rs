use crate::application::config::Credentials;
use crate::error::AppError;
use crate::model::auth::{LoginGrant, SessionTokens};
use crate::model::requests::SwitchAccountRequest;
use crate::model::responses::DealConfirmation;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

/// Boundary to the broker REST API
///
/// Implementations perform exactly one HTTP exchange per call. Rate admission,
/// session handling and retries of safe reads belong to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Creates a session with the broker
    ///
    /// # Errors
    /// [`AppError::Auth`] when the credentials are refused, [`AppError::Upstream`]
    /// or [`AppError::Network`] when the broker cannot be reached
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginGrant, AppError>;

    /// Token-bearing call returning the decoded JSON body (`null` when empty)
    ///
    /// # Errors
    /// [`AppError::SessionExpired`] on HTTP 401, [`AppError::RateLimited`] on
    /// HTTP 429, [`AppError::Upstream`] for every other failure
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        tokens: &SessionTokens,
    ) -> Result<Value, AppError>;

    /// Selects a different financial account for the session
    async fn switch_account(
        &self,
        account_id: &str,
        tokens: &SessionTokens,
    ) -> Result<Value, AppError> {
        let body = serde_json::to_value(SwitchAccountRequest { account_id })?;
        self.request(Method::PUT, "/session", &[], Some(&body), tokens)
            .await
    }

    /// Keeps the session alive
    async fn ping(&self, tokens: &SessionTokens) -> Result<Value, AppError> {
        self.request(Method::GET, "/ping", &[], None, tokens).await
    }

    /// Ends the session on the broker side
    async fn logout(&self, tokens: &SessionTokens) -> Result<Value, AppError> {
        self.request(Method::DELETE, "/session", &[], None, tokens)
            .await
    }

    /// Looks up the verdict on a submitted deal
    async fn confirmation(
        &self,
        deal_reference: &str,
        tokens: &SessionTokens,
    ) -> Result<DealConfirmation, AppError> {
        let path = format!("/confirms/{deal_reference}");
        let body = self.request(Method::GET, &path, &[], None, tokens).await?;
        let mut confirmation: DealConfirmation = serde_json::from_value(body)?;
        if confirmation.deal_reference.is_empty() {
            confirmation.deal_reference = deal_reference.to_string();
        }
        Ok(confirmation)
    }
}

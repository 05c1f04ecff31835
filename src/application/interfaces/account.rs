use crate::error::AppError;
use crate::model::requests::{AccountPreferencesUpdate, HistoryQuery};
use crate::model::responses::DealConfirmation;
use async_trait::async_trait;
use serde_json::Value;

/// Account data, plus the account-level writes behind the trading gates
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Gets information about all user accounts
    async fn get_accounts(&self) -> Result<Value, AppError>;

    /// Gets leverage and hedging preferences
    async fn get_account_preferences(&self) -> Result<Value, AppError>;

    /// Gets account activity
    ///
    /// # Arguments
    /// * `query` - Date range (e.g. "2026-01-01T00:00:00") or look-back period
    async fn get_activity(&self, query: &HistoryQuery) -> Result<Value, AppError>;

    /// Gets transaction history
    async fn get_transactions(&self, query: &HistoryQuery) -> Result<Value, AppError>;

    /// Gets open positions
    async fn get_positions(&self) -> Result<Value, AppError>;

    /// Gets one open position
    async fn get_position(&self, deal_id: &str) -> Result<Value, AppError>;

    /// Gets working orders
    async fn get_working_orders(&self) -> Result<Value, AppError>;

    /// Gets the confirmation of a deal
    async fn get_deal_confirmation(
        &self,
        deal_reference: &str,
    ) -> Result<DealConfirmation, AppError>;

    /// Changes hedging mode and leverages
    ///
    /// Gated by the trading switch, then confirmation, then dry-run mode.
    async fn update_account_preferences(
        &self,
        update: &AccountPreferencesUpdate,
        confirm: bool,
    ) -> Result<Value, AppError>;

    /// Adds funds to a demo account; refused in the live environment
    async fn top_up_demo_account(&self, amount: f64, confirm: bool) -> Result<Value, AppError>;
}

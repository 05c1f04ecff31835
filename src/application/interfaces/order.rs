use crate::application::gateway::ConfirmationOutcome;
use crate::error::AppError;
use crate::model::preview::PreviewRecord;
use crate::model::requests::TradeRequest;
use crate::model::responses::ExecutionResult;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
/// Guarded trade writes
///
/// Every new position or working order goes through a preview first; close and
/// cancel are gated by the trading switch, confirmation and dry-run mode.
pub trait TradingService: Send + Sync {
    /// Validates and checks a trade without submitting anything
    async fn preview(&self, request: TradeRequest) -> Result<PreviewRecord, AppError>;

    /// Submits a previewed trade, at most once
    async fn execute(
        &self,
        preview_id: &str,
        confirm: bool,
        wait_for_confirm: bool,
    ) -> Result<ExecutionResult, AppError>;

    /// Closes an open position
    async fn close_position(
        &self,
        deal_id: &str,
        confirm: bool,
        wait_for_confirm: bool,
    ) -> Result<ExecutionResult, AppError>;

    /// Cancels a working order
    async fn cancel_working_order(
        &self,
        deal_id: &str,
        confirm: bool,
        wait_for_confirm: bool,
    ) -> Result<ExecutionResult, AppError>;

    /// Polls a deal confirmation until it is final or `timeout` elapses
    async fn wait_for_confirmation(
        &self,
        deal_reference: &str,
        timeout: Option<Duration>,
    ) -> Result<ConfirmationOutcome, AppError>;
}

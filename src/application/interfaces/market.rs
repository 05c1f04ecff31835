use crate::error::AppError;
use crate::model::requests::PriceQuery;
use async_trait::async_trait;
use serde_json::Value;

/// Read-only market data, returned as the broker sends it
#[async_trait]
pub trait MarketService: Send + Sync {
    /// Searches markets by term, or looks up a list of epics
    async fn search_markets(
        &self,
        search_term: Option<&str>,
        epics: &[String],
    ) -> Result<Value, AppError>;

    /// Gets details, dealing rules and snapshot of a market
    async fn get_market_details(&self, epic: &str) -> Result<Value, AppError>;

    /// Gets historical prices for a market
    ///
    /// # Arguments
    /// * `epic` - Instrument epic
    /// * `query` - Resolution, candle count and optional date range
    async fn get_prices(&self, epic: &str, query: &PriceQuery) -> Result<Value, AppError>;

    /// Gets the top level of the market navigation tree
    async fn get_market_navigation(&self) -> Result<Value, AppError>;

    /// Gets one node of the market navigation tree
    async fn get_market_navigation_node(
        &self,
        node_id: &str,
        limit: Option<u32>,
    ) -> Result<Value, AppError>;

    /// Gets long/short client sentiment for one or more markets
    async fn get_client_sentiment(&self, market_ids: &[String]) -> Result<Value, AppError>;
}

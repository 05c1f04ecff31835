/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 13/5/25
******************************************************************************/
use crate::error::AppError;
use pretty_simple_display::DisplaySimple;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Order direction (buy or sell)
#[derive(Debug, Clone, Copy, DisplaySimple, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Buy direction (long position)
    #[default]
    Buy,
    /// Sell direction (short position)
    Sell,
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Direction::Buy),
            "SELL" => Ok(Direction::Sell),
            other => Err(AppError::Validation(format!(
                "direction must be BUY or SELL, got '{other}'"
            ))),
        }
    }
}

/// Working order type
#[derive(Debug, Clone, Copy, DisplaySimple, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkingOrderType {
    /// Limit order - executed when price reaches the level or better
    #[default]
    Limit,
    /// Stop order - becomes a market order when price crosses the level
    Stop,
}

impl FromStr for WorkingOrderType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LIMIT" => Ok(WorkingOrderType::Limit),
            "STOP" => Ok(WorkingOrderType::Stop),
            other => Err(AppError::Validation(format!(
                "working order type must be LIMIT or STOP, got '{other}'"
            ))),
        }
    }
}

/// Broker verdict on a submitted deal
#[derive(Debug, Clone, DisplaySimple, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DealStatus {
    /// The deal was accepted
    Accepted,
    /// The deal was rejected
    Rejected,
    /// No verdict yet
    #[default]
    #[serde(other)]
    Pending,
}

impl DealStatus {
    /// Accepted and rejected are final; anything else is still pending
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStatus::Accepted | DealStatus::Rejected)
    }
}

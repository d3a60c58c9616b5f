//! Simulated trade execution with price-threshold guards.
//!
//! This is a simulation boundary, not a trading engine: no order is
//! ever placed. The task fetches the current price, enforces the
//! optional threshold, and returns a synthetic execution record.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::MarketClient;
use crate::error::TaskError;
use crate::tasks::{Task, TaskData, parse_params};

pub struct ExecuteTradeTask {
    market: Arc<dyn MarketClient>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteTradeParams {
    trade_type: TradeSide,
    token: String,
    amount: Decimal,
    #[serde(default)]
    price_threshold: Option<Decimal>,
}

/// Synthetic execution record for a simulated trade.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TradeRecord {
    pub trade_type: TradeSide,
    pub amount: Decimal,
    pub token: String,
    pub execution_price: Decimal,
    pub timestamp: DateTime<Utc>,
}

fn check_threshold(
    side: TradeSide,
    price: Decimal,
    threshold: Option<Decimal>,
) -> Result<(), TaskError> {
    let Some(threshold) = threshold else {
        return Ok(());
    };
    match side {
        TradeSide::Buy if price > threshold => {
            Err(TaskError::Validation("Price above threshold".to_string()))
        }
        TradeSide::Sell if price < threshold => {
            Err(TaskError::Validation("Price below threshold".to_string()))
        }
        _ => Ok(()),
    }
}

impl ExecuteTradeTask {
    pub fn new(market: Arc<dyn MarketClient>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Task for ExecuteTradeTask {
    fn name(&self) -> &'static str {
        "execute_trade"
    }

    async fn execute(&self, params: Value) -> Result<TaskData, TaskError> {
        let params: ExecuteTradeParams = parse_params(params)?;
        let quote = self.market.get_price(&params.token).await?;

        check_threshold(params.trade_type, quote.price, params.price_threshold)?;

        tracing::info!(
            side = params.trade_type.as_str(),
            token = %params.token,
            amount = %params.amount,
            price = %quote.price,
            "simulated trade executed"
        );

        Ok(TaskData::Trade(TradeRecord {
            trade_type: params.trade_type,
            amount: params.amount,
            token: params.token,
            execution_price: quote.price,
            timestamp: Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn buy_above_threshold_is_rejected() {
        let err = check_threshold(TradeSide::Buy, dec!(3500), Some(dec!(3000))).unwrap_err();
        assert_eq!(err.to_string(), "Price above threshold");
    }

    #[test]
    fn sell_below_threshold_is_rejected() {
        let err = check_threshold(TradeSide::Sell, dec!(2500), Some(dec!(3000))).unwrap_err();
        assert_eq!(err.to_string(), "Price below threshold");
    }

    #[test]
    fn threshold_boundary_is_allowed() {
        assert!(check_threshold(TradeSide::Buy, dec!(3000), Some(dec!(3000))).is_ok());
        assert!(check_threshold(TradeSide::Sell, dec!(3000), Some(dec!(3000))).is_ok());
    }

    #[test]
    fn no_threshold_always_passes() {
        assert!(check_threshold(TradeSide::Buy, dec!(99999), None).is_ok());
    }
}

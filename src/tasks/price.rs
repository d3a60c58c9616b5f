//! Price lookup with a threshold-based recommendation.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::MarketClient;
use crate::error::TaskError;
use crate::tasks::{Task, TaskData, parse_params};

pub struct CheckPriceTask {
    market: Arc<dyn MarketClient>,
}

#[derive(Debug, Deserialize)]
struct CheckPriceParams {
    symbol: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceCheckReport {
    pub symbol: String,
    pub price: Decimal,
    pub change_24h: Decimal,
    pub volume_24h: Decimal,
    pub market_cap: Decimal,
    pub recommendation: &'static str,
}

/// Fixed thresholds, strict comparisons: exactly +5.0 / -5.0 is still
/// "Market Stable".
pub(crate) fn recommendation(change_24h: Decimal) -> &'static str {
    if change_24h > dec!(5) {
        "Consider Taking Profits"
    } else if change_24h < dec!(-5) {
        "Potential Buying Opportunity"
    } else {
        "Market Stable"
    }
}

impl CheckPriceTask {
    pub fn new(market: Arc<dyn MarketClient>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Task for CheckPriceTask {
    fn name(&self) -> &'static str {
        "check_price"
    }

    async fn execute(&self, params: Value) -> Result<TaskData, TaskError> {
        let params: CheckPriceParams = parse_params(params)?;
        let quote = self.market.get_price(&params.symbol).await?;

        Ok(TaskData::Price(PriceCheckReport {
            symbol: params.symbol,
            price: quote.price,
            change_24h: quote.change_24h,
            volume_24h: quote.volume_24h,
            market_cap: quote.market_cap,
            recommendation: recommendation(quote.change_24h),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_strict_boundaries() {
        assert_eq!(recommendation(dec!(5.0)), "Market Stable");
        assert_eq!(recommendation(dec!(5.0001)), "Consider Taking Profits");
        assert_eq!(recommendation(dec!(-5.0)), "Market Stable");
        assert_eq!(recommendation(dec!(-5.0001)), "Potential Buying Opportunity");
        assert_eq!(recommendation(dec!(0)), "Market Stable");
    }
}

//! Whole-market analysis: top performers and a sentiment call.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use serde_json::Value;

use crate::clients::{AssetSummary, MarketClient};
use crate::error::TaskError;
use crate::tasks::{Task, TaskData};

/// How many assets to pull for the analysis window.
const TOP_ASSETS_LIMIT: usize = 10;
/// How many top performers the report keeps.
const TOP_PERFORMER_COUNT: usize = 3;

pub struct AnalyzeMarketTask {
    market: Arc<dyn MarketClient>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarketSentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl MarketSentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "Bullish",
            Self::Bearish => "Bearish",
            Self::Neutral => "Neutral",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Bullish => "Strong market momentum - consider increasing exposure",
            Self::Bearish => "Market weakness - consider reducing risk",
            Self::Neutral => "Mixed signals - hold current positions",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarketAnalysisReport {
    pub sentiment: MarketSentiment,
    pub market_cap_change_24h: Decimal,
    pub top_performers: Vec<AssetSummary>,
    pub recommendation: &'static str,
}

/// Same strict ±5% boundaries as the per-symbol recommendation.
pub(crate) fn sentiment(market_cap_change_24h: Decimal) -> MarketSentiment {
    if market_cap_change_24h > dec!(5) {
        MarketSentiment::Bullish
    } else if market_cap_change_24h < dec!(-5) {
        MarketSentiment::Bearish
    } else {
        MarketSentiment::Neutral
    }
}

/// Positive 24h movers, best first, capped at [`TOP_PERFORMER_COUNT`].
pub(crate) fn top_performers(assets: Vec<AssetSummary>) -> Vec<AssetSummary> {
    let mut gainers: Vec<AssetSummary> = assets
        .into_iter()
        .filter(|asset| asset.change_24h > Decimal::ZERO)
        .collect();
    gainers.sort_by(|a, b| b.change_24h.cmp(&a.change_24h));
    gainers.truncate(TOP_PERFORMER_COUNT);
    gainers
}

impl AnalyzeMarketTask {
    pub fn new(market: Arc<dyn MarketClient>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Task for AnalyzeMarketTask {
    fn name(&self) -> &'static str {
        "analyze_market"
    }

    async fn execute(&self, _params: Value) -> Result<TaskData, TaskError> {
        let assets = self.market.get_top_assets(TOP_ASSETS_LIMIT).await?;
        let stats = self.market.get_market_stats().await?;

        let sentiment = sentiment(stats.market_cap_change_24h);
        Ok(TaskData::Market(MarketAnalysisReport {
            sentiment,
            market_cap_change_24h: stats.market_cap_change_24h,
            top_performers: top_performers(assets),
            recommendation: sentiment.recommendation(),
        }))
    }
}

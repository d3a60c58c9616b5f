//! CoinGecko-compatible market data client.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use crate::clients::{AssetSummary, GlobalStats, MarketClient, PriceQuote};
use crate::config::Config;
use crate::error::ClientError;

pub struct RestMarketClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MarketRow {
    symbol: String,
    name: String,
    #[serde(default)]
    current_price: Option<Decimal>,
    #[serde(default)]
    price_change_percentage_24h: Option<Decimal>,
    #[serde(default)]
    total_volume: Option<Decimal>,
    #[serde(default)]
    market_cap: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct GlobalEnvelope {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    total_market_cap: HashMap<String, Decimal>,
    total_volume: HashMap<String, Decimal>,
    #[serde(default)]
    market_cap_change_percentage_24h_usd: Decimal,
}

/// Map common ticker symbols to provider coin ids. Anything not listed
/// is passed through lowercased, which works for full names
/// ("bitcoin", "solana").
fn coin_id(symbol: &str) -> String {
    match symbol.trim().to_ascii_lowercase().as_str() {
        "btc" => "bitcoin".to_string(),
        "eth" => "ethereum".to_string(),
        "sol" => "solana".to_string(),
        "ada" => "cardano".to_string(),
        "xrp" => "ripple".to_string(),
        "doge" => "dogecoin".to_string(),
        "dot" => "polkadot".to_string(),
        "ltc" => "litecoin".to_string(),
        other => other.to_string(),
    }
}

impl RestMarketClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.market_api_url.trim_end_matches('/').to_string(),
            api_key: config.market_api_key.clone(),
        }
    }

    async fn get_markets(&self, query: &[(&str, &str)]) -> Result<Vec<MarketRow>, ClientError> {
        let mut request = self
            .http
            .get(format!("{}/coins/markets", self.base_url))
            .query(&[("vs_currency", "usd")])
            .query(query);
        if let Some(ref key) = self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }
        Ok(request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

#[async_trait]
impl MarketClient for RestMarketClient {
    async fn get_price(&self, symbol: &str) -> Result<PriceQuote, ClientError> {
        let id = coin_id(symbol);
        let rows = self.get_markets(&[("ids", id.as_str())]).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(format!("price data for '{}'", symbol)))?;

        Ok(PriceQuote {
            price: row.current_price.unwrap_or_default(),
            change_24h: row.price_change_percentage_24h.unwrap_or_default(),
            volume_24h: row.total_volume.unwrap_or_default(),
            market_cap: row.market_cap.unwrap_or_default(),
        })
    }

    async fn get_top_assets(&self, limit: usize) -> Result<Vec<AssetSummary>, ClientError> {
        let per_page = limit.to_string();
        let rows = self
            .get_markets(&[
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", "1"),
            ])
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| AssetSummary {
                symbol: row.symbol.to_ascii_uppercase(),
                name: row.name,
                price: row.current_price.unwrap_or_default(),
                change_24h: row.price_change_percentage_24h.unwrap_or_default(),
            })
            .collect())
    }

    async fn get_market_stats(&self) -> Result<GlobalStats, ClientError> {
        let mut request = self.http.get(format!("{}/global", self.base_url));
        if let Some(ref key) = self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }
        let envelope: GlobalEnvelope = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let usd = |map: &HashMap<String, Decimal>| map.get("usd").copied().unwrap_or_default();
        Ok(GlobalStats {
            total_market_cap_usd: usd(&envelope.data.total_market_cap),
            total_volume_usd: usd(&envelope.data.total_volume),
            market_cap_change_24h: envelope.data.market_cap_change_percentage_24h_usd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_tickers_to_coin_ids() {
        assert_eq!(coin_id("BTC"), "bitcoin");
        assert_eq!(coin_id("eth"), "ethereum");
        assert_eq!(coin_id("bitcoin"), "bitcoin");
        assert_eq!(coin_id(" Sol "), "solana");
    }
}

//! Capability clients consumed by the task layer.
//!
//! The core calls blockchain and market-data providers through the
//! narrow async traits below. Production implementations live in
//! [`rpc`] and [`market`]; tests substitute in-memory mocks.

pub mod market;
pub mod rpc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub use self::market::RestMarketClient;
pub use self::rpc::JsonRpcChainClient;

/// Lifecycle state of an on-chain transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    NotFound,
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "Not Found",
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Failed => "Failed",
        }
    }
}

/// One entry in a wallet's transaction history, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionEntry {
    pub hash: String,
    pub from: String,
    /// Absent for contract-creation transactions.
    pub to: Option<String>,
    /// Value in the chain's native currency unit.
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Price quote for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub price: Decimal,
    pub change_24h: Decimal,
    pub volume_24h: Decimal,
    pub market_cap: Decimal,
}

/// Summary row for a top-assets listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetSummary {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub change_24h: Decimal,
}

/// Global market statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalStats {
    pub total_market_cap_usd: Decimal,
    pub total_volume_usd: Decimal,
    pub market_cap_change_24h: Decimal,
}

/// Blockchain I/O provider.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Balance of `address` in the chain's native currency unit.
    async fn get_balance(&self, address: &str) -> Result<Decimal, ClientError>;

    /// Transaction history for `address`, most recent first.
    async fn get_transaction_history(
        &self,
        address: &str,
    ) -> Result<Vec<TransactionEntry>, ClientError>;

    async fn get_transaction_status(&self, hash: &str) -> Result<TxStatus, ClientError>;

    /// Current gas price in gwei.
    async fn get_gas_price(&self) -> Result<Decimal, ClientError>;

    /// Estimated gas units for a contract call.
    async fn estimate_contract_gas(
        &self,
        address: &str,
        abi: &serde_json::Value,
        method: &str,
        args: &[serde_json::Value],
    ) -> Result<Decimal, ClientError>;
}

/// Market-data I/O provider.
#[async_trait]
pub trait MarketClient: Send + Sync {
    async fn get_price(&self, symbol: &str) -> Result<PriceQuote, ClientError>;

    async fn get_top_assets(&self, limit: usize) -> Result<Vec<AssetSummary>, ClientError>;

    async fn get_market_stats(&self) -> Result<GlobalStats, ClientError>;
}

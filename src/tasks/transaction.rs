//! Transaction status tracking with a gas-price recommendation.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::{ChainClient, TxStatus};
use crate::error::TaskError;
use crate::tasks::{Task, TaskData, parse_params};

const STUCK_RECOMMENDATION: &str =
    "Transaction pending with high network gas price - consider raising the gas price";
const NORMAL_RECOMMENDATION: &str = "Transaction progressing normally";

pub struct TrackTransactionTask {
    chain: Arc<dyn ChainClient>,
}

#[derive(Debug, Deserialize)]
struct TrackTransactionParams {
    tx_hash: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransactionTrackingReport {
    pub tx_hash: String,
    pub status: TxStatus,
    pub gas_price_gwei: Decimal,
    pub recommendation: &'static str,
}

pub(crate) fn recommendation(status: TxStatus, gas_price_gwei: Decimal) -> &'static str {
    if status == TxStatus::Pending && gas_price_gwei > dec!(100) {
        STUCK_RECOMMENDATION
    } else {
        NORMAL_RECOMMENDATION
    }
}

impl TrackTransactionTask {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Task for TrackTransactionTask {
    fn name(&self) -> &'static str {
        "track_transaction"
    }

    async fn execute(&self, params: Value) -> Result<TaskData, TaskError> {
        let params: TrackTransactionParams = parse_params(params)?;
        let status = self.chain.get_transaction_status(&params.tx_hash).await?;
        let gas_price_gwei = self.chain.get_gas_price().await?;

        Ok(TaskData::Transaction(TransactionTrackingReport {
            tx_hash: params.tx_hash,
            status,
            gas_price_gwei,
            recommendation: recommendation(status, gas_price_gwei),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_with_high_gas_suggests_raising() {
        assert_eq!(
            recommendation(TxStatus::Pending, dec!(150)),
            STUCK_RECOMMENDATION
        );
    }

    #[test]
    fn gas_boundary_is_strict() {
        assert_eq!(
            recommendation(TxStatus::Pending, dec!(100)),
            NORMAL_RECOMMENDATION
        );
    }

    #[test]
    fn non_pending_statuses_are_normal_regardless_of_gas() {
        for status in [TxStatus::Confirmed, TxStatus::Failed, TxStatus::NotFound] {
            assert_eq!(recommendation(status, dec!(500)), NORMAL_RECOMMENDATION);
        }
    }
}

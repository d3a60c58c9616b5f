//! Wallet monitoring with a derived security status.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::{ChainClient, TransactionEntry};
use crate::error::TaskError;
use crate::tasks::{Task, TaskData, parse_params};

/// How many of the most recent transactions the report carries.
const RECENT_TX_COUNT: usize = 5;

const HIGH_ACTIVITY: &str = "High Activity - Enhanced Security Recommended";
const NORMAL_ACTIVITY: &str = "Normal Activity";

pub struct MonitorWalletTask {
    chain: Arc<dyn ChainClient>,
}

#[derive(Debug, Deserialize)]
struct MonitorWalletParams {
    address: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WalletMonitorReport {
    pub address: String,
    pub balance: Decimal,
    pub transaction_count: usize,
    /// Most recent transactions, newest first.
    pub recent_transactions: Vec<TransactionEntry>,
    pub security_status: &'static str,
}

/// High activity means many distinct recipients AND several large
/// transfers; both counts are over the full history, not just the
/// recent window.
pub(crate) fn security_status(history: &[TransactionEntry]) -> &'static str {
    let distinct_recipients: BTreeSet<&str> = history
        .iter()
        .filter_map(|tx| tx.to.as_deref())
        .collect();
    let large_transfers = history.iter().filter(|tx| tx.value > dec!(1)).count();

    if distinct_recipients.len() > 10 && large_transfers > 5 {
        HIGH_ACTIVITY
    } else {
        NORMAL_ACTIVITY
    }
}

impl MonitorWalletTask {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Task for MonitorWalletTask {
    fn name(&self) -> &'static str {
        "monitor_wallet"
    }

    async fn execute(&self, params: Value) -> Result<TaskData, TaskError> {
        let params: MonitorWalletParams = parse_params(params)?;
        let balance = self.chain.get_balance(&params.address).await?;
        let history = self.chain.get_transaction_history(&params.address).await?;

        let security_status = security_status(&history);
        let recent_transactions: Vec<TransactionEntry> =
            history.iter().take(RECENT_TX_COUNT).cloned().collect();

        Ok(TaskData::Wallet(WalletMonitorReport {
            address: params.address,
            balance,
            transaction_count: history.len(),
            recent_transactions,
            security_status,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(to: &str, value: Decimal) -> TransactionEntry {
        TransactionEntry {
            hash: format!("0xh{}{}", to, value),
            from: "0xsender".to_string(),
            to: Some(to.to_string()),
            value,
            timestamp: None,
        }
    }

    #[test]
    fn quiet_wallet_is_normal_activity() {
        let history = vec![tx("0xa", dec!(0.5)), tx("0xb", dec!(2))];
        assert_eq!(security_status(&history), NORMAL_ACTIVITY);
    }

    #[test]
    fn high_activity_needs_both_conditions() {
        // 11 distinct recipients but only small transfers.
        let spread: Vec<_> = (0..11).map(|i| tx(&format!("0x{}", i), dec!(0.1))).collect();
        assert_eq!(security_status(&spread), NORMAL_ACTIVITY);

        // 6 large transfers but few recipients.
        let large: Vec<_> = (0..6).map(|_| tx("0xsame", dec!(3))).collect();
        assert_eq!(security_status(&large), NORMAL_ACTIVITY);

        // Both together.
        let mut busy: Vec<_> = (0..11).map(|i| tx(&format!("0x{}", i), dec!(0.1))).collect();
        busy.extend((0..6).map(|i| tx(&format!("0x{}", i), dec!(5))));
        assert_eq!(security_status(&busy), HIGH_ACTIVITY);
    }

    #[test]
    fn boundary_counts_do_not_trigger() {
        // Exactly 10 recipients and exactly 5 large transfers: strict
        // greater-than on both, so still normal.
        let mut history: Vec<_> = (0..10).map(|i| tx(&format!("0x{}", i), dec!(0.1))).collect();
        history.extend((0..5).map(|i| tx(&format!("0x{}", i), dec!(2))));
        assert_eq!(security_status(&history), NORMAL_ACTIVITY);
    }
}

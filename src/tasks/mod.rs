//! Task registry and dispatch contract.
//!
//! Tasks are named async operations registered once at construction;
//! the registry is immutable afterwards. `execute_task` is the uniform
//! result boundary: every outcome, including unknown names and handler
//! failures, comes back as a [`TaskResult`] and never as a raised
//! error, so callers (rule engine, command router) treat all tasks
//! identically regardless of underlying I/O failures.

pub mod contract;
pub mod market;
pub mod price;
pub mod trade;
pub mod transaction;
pub mod wallet;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::clients::{ChainClient, MarketClient};
use crate::error::TaskError;

pub use self::contract::{ContractCallEstimate, SmartContractInteractionTask};
pub use self::market::{AnalyzeMarketTask, MarketAnalysisReport, MarketSentiment};
pub use self::price::{CheckPriceTask, PriceCheckReport};
pub use self::trade::{ExecuteTradeTask, TradeRecord, TradeSide};
pub use self::transaction::{TrackTransactionTask, TransactionTrackingReport};
pub use self::wallet::{MonitorWalletTask, WalletMonitorReport};

/// Typed payload produced by a successful task, one variant per
/// registered task name.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskData {
    Price(PriceCheckReport),
    Wallet(WalletMonitorReport),
    Trade(TradeRecord),
    Market(MarketAnalysisReport),
    Transaction(TransactionTrackingReport),
    Contract(ContractCallEstimate),
}

/// Uniform outcome of a task invocation.
///
/// Exactly one of `data` / `error` is meaningful, gated by `success`.
/// Only the registry constructs these; handlers return `TaskData` or
/// fail with a `TaskError` and the dispatch wrapper packages them.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<TaskData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    fn completed(data: TaskData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// A named async operation with uniform success/failure reporting.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, params: Value) -> Result<TaskData, TaskError>;
}

/// Immutable mapping from task name to handler.
pub struct TaskRegistry {
    tasks: BTreeMap<&'static str, Box<dyn Task>>,
}

impl TaskRegistry {
    /// Build the registry with all built-in tasks wired to the given
    /// capability clients.
    pub fn with_builtin_tasks(
        chain: Arc<dyn ChainClient>,
        market: Arc<dyn MarketClient>,
    ) -> Self {
        Self::from_tasks(vec![
            Box::new(CheckPriceTask::new(Arc::clone(&market))),
            Box::new(MonitorWalletTask::new(Arc::clone(&chain))),
            Box::new(ExecuteTradeTask::new(Arc::clone(&market))),
            Box::new(AnalyzeMarketTask::new(market)),
            Box::new(TrackTransactionTask::new(Arc::clone(&chain))),
            Box::new(SmartContractInteractionTask::new(chain)),
        ])
    }

    /// Build a registry from an explicit task list. Later entries with
    /// a duplicate name replace earlier ones.
    pub fn from_tasks(tasks: Vec<Box<dyn Task>>) -> Self {
        Self {
            tasks: tasks.into_iter().map(|task| (task.name(), task)).collect(),
        }
    }

    /// Registered task names, in lexical order.
    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.keys().copied().collect()
    }

    /// Execute a task by name. Never raises: unknown names and handler
    /// failures both come back as `success: false`.
    pub async fn execute_task(&self, name: &str, params: Value) -> TaskResult {
        let Some(task) = self.tasks.get(name) else {
            return TaskResult::failed(format!("Task '{}' not found", name));
        };

        match task.execute(params).await {
            Ok(data) => TaskResult::completed(data),
            Err(err) => {
                tracing::debug!(task = name, error = %err, "task failed");
                TaskResult::failed(err.to_string())
            }
        }
    }
}

/// Deserialize a task's parameter struct out of the raw params value.
fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, TaskError> {
    serde_json::from_value(params).map_err(|e| TaskError::InvalidParameters(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    struct FlakyTask;

    #[async_trait]
    impl Task for FlakyTask {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn execute(&self, _params: Value) -> Result<TaskData, TaskError> {
            Err(TaskError::Validation("upstream exploded".to_string()))
        }
    }

    struct EchoTask;

    #[async_trait]
    impl Task for EchoTask {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn execute(&self, _params: Value) -> Result<TaskData, TaskError> {
            Ok(TaskData::Trade(TradeRecord {
                trade_type: TradeSide::Buy,
                amount: dec!(1),
                token: "eth".to_string(),
                execution_price: dec!(2000),
                timestamp: chrono::DateTime::UNIX_EPOCH,
            }))
        }
    }

    fn registry() -> TaskRegistry {
        TaskRegistry::from_tasks(vec![Box::new(FlakyTask), Box::new(EchoTask)])
    }

    #[tokio::test]
    async fn unknown_task_reports_not_found_without_raising() {
        let result = registry().execute_task("nope", Value::Null).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Task 'nope' not found"));
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn handler_failure_is_captured_as_error_text() {
        let result = registry().execute_task("flaky", Value::Null).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("upstream exploded"));
    }

    #[tokio::test]
    async fn handler_success_wraps_data() {
        let result = registry().execute_task("echo", Value::Null).await;
        assert!(result.success);
        assert!(result.error.is_none());
        assert!(matches!(result.data, Some(TaskData::Trade(_))));
    }

    #[test]
    fn task_names_are_sorted() {
        assert_eq!(registry().task_names(), vec!["echo", "flaky"]);
    }
}

//! Automation rule engine.
//!
//! Rules pair a condition string with a task-registry action and an
//! optional recurring interval. Rules with an interval get a monitor: a
//! spawned tokio task that evaluates the condition on each tick and
//! executes the action through the registry when it holds. A tick
//! failure is logged and never stops the monitor.
//!
//! Ticks are serialized per rule: each monitor is a single task that
//! fully awaits one evaluation+action cycle before the next tick, with
//! missed ticks skipped. Removal signals the monitor to stop between
//! cycles; an in-flight cycle runs to completion and may still execute
//! its action once.

pub mod condition;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{Mutex, watch};
use tokio::time::MissedTickBehavior;

use crate::clients::{ChainClient, MarketClient};
use crate::tasks::{TaskRegistry, TaskResult};

pub use self::condition::Condition;

/// Monotonic rule identifier; never reused, even after removal.
pub type RuleId = u64;

/// Default interval for price alerts.
pub const DEFAULT_PRICE_ALERT_INTERVAL: Duration = Duration::from_secs(60);
/// Default interval for wallet monitors.
pub const DEFAULT_WALLET_MONITOR_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Default interval for market analysis.
pub const DEFAULT_MARKET_ANALYSIS_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// A stored automation rule. Immutable once created; removal is the
/// only lifecycle transition.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AutomationRule {
    /// Colon-delimited condition, see [`Condition`].
    pub condition: String,
    /// Task name executed through the registry when the condition holds.
    pub action: String,
    /// Params passed verbatim to the action task.
    pub params: serde_json::Value,
    /// Evaluation cadence; `None` means the rule only runs when driven
    /// manually.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,
}

#[derive(Default)]
struct EngineState {
    rules: BTreeMap<RuleId, AutomationRule>,
    /// Stop signals for live monitors. Dropping a sender also stops
    /// its monitor between cycles.
    monitors: BTreeMap<RuleId, watch::Sender<bool>>,
    next_id: RuleId,
}

pub struct AutomationEngine {
    registry: Arc<TaskRegistry>,
    market: Arc<dyn MarketClient>,
    chain: Arc<dyn ChainClient>,
    state: Mutex<EngineState>,
}

impl AutomationEngine {
    pub fn new(
        registry: Arc<TaskRegistry>,
        market: Arc<dyn MarketClient>,
        chain: Arc<dyn ChainClient>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            market,
            chain,
            state: Mutex::new(EngineState::default()),
        })
    }

    /// Store a rule and, if it has an interval, start its monitor
    /// immediately. Returns the new rule's id.
    pub async fn add_rule(self: &Arc<Self>, rule: AutomationRule) -> RuleId {
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;

        if let Some(every) = rule.interval {
            state.monitors.insert(id, self.spawn_monitor(id, every));
        }
        state.rules.insert(id, rule);

        tracing::info!(rule_id = id, "rule added");
        id
    }

    /// Remove a rule and stop its monitor. Returns false for ids that
    /// don't map to a live rule (out of range or already removed);
    /// callers treat that as "nothing to remove", not an error.
    pub async fn remove_rule(&self, id: RuleId) -> bool {
        let mut state = self.state.lock().await;
        if state.rules.remove(&id).is_none() {
            return false;
        }
        if let Some(stop) = state.monitors.remove(&id) {
            // An in-flight cycle is not cancelled; the monitor observes
            // the signal before its next cycle and exits.
            let _ = stop.send(true);
        }
        tracing::info!(rule_id = id, "rule removed");
        true
    }

    /// Live rules in ascending id order.
    pub async fn active_rules(&self) -> Vec<(RuleId, AutomationRule)> {
        let state = self.state.lock().await;
        state
            .rules
            .iter()
            .map(|(id, rule)| (*id, rule.clone()))
            .collect()
    }

    /// Stop every monitor without touching rule data. Rules remain
    /// queryable but inert; used for graceful shutdown.
    pub async fn stop_all_monitoring(&self) {
        let mut state = self.state.lock().await;
        let stopped = state.monitors.len();
        for (_, stop) in std::mem::take(&mut state.monitors) {
            let _ = stop.send(true);
        }
        if stopped > 0 {
            tracing::info!(monitors = stopped, "all monitoring stopped");
        }
    }

    /// Alert when `symbol` trades strictly below `threshold`; fires a
    /// simulated buy through the registry.
    pub async fn setup_price_alert(
        self: &Arc<Self>,
        symbol: &str,
        threshold: Decimal,
        interval: Option<Duration>,
    ) -> RuleId {
        self.add_rule(AutomationRule {
            condition: format!("price_below_threshold:{}:{}", symbol, threshold.normalize()),
            action: "execute_trade".to_string(),
            params: json!({
                "trade_type": "buy",
                "token": symbol,
                "amount": "0.1",
            }),
            interval: Some(interval.unwrap_or(DEFAULT_PRICE_ALERT_INTERVAL)),
        })
        .await
    }

    /// Re-check a wallet whenever its balance sits above `min_balance`.
    pub async fn setup_wallet_monitor(
        self: &Arc<Self>,
        address: &str,
        min_balance: Decimal,
        interval: Option<Duration>,
    ) -> RuleId {
        self.add_rule(AutomationRule {
            condition: format!(
                "wallet_balance_above:{}:{}",
                address,
                min_balance.normalize()
            ),
            action: "monitor_wallet".to_string(),
            params: json!({ "address": address }),
            interval: Some(interval.unwrap_or(DEFAULT_WALLET_MONITOR_INTERVAL)),
        })
        .await
    }

    /// Periodic market analysis slot. The condition type is not one of
    /// the built-ins, so it is fail-closed and the action only runs
    /// when a cycle is driven manually; see DESIGN.md.
    pub async fn setup_market_analysis(self: &Arc<Self>, interval: Option<Duration>) -> RuleId {
        self.add_rule(AutomationRule {
            condition: "market_analysis".to_string(),
            action: "analyze_market".to_string(),
            params: json!({}),
            interval: Some(interval.unwrap_or(DEFAULT_MARKET_ANALYSIS_INTERVAL)),
        })
        .await
    }

    /// One evaluation cycle for a rule: parse and evaluate the
    /// condition, and execute the action through the registry if it
    /// holds. Returns `None` when the rule is gone or the condition is
    /// not met. This is the monitor tick body; tests drive it directly
    /// to simulate ticks without timers.
    pub async fn run_rule_cycle(&self, id: RuleId) -> Option<TaskResult> {
        let rule = {
            let state = self.state.lock().await;
            state.rules.get(&id).cloned()
        }?;

        let condition = Condition::parse(&rule.condition);
        if !condition
            .evaluate(self.market.as_ref(), self.chain.as_ref())
            .await
        {
            return None;
        }

        tracing::info!(rule_id = id, action = %rule.action, "condition met, executing action");
        let result = self.registry.execute_task(&rule.action, rule.params).await;
        if !result.success {
            tracing::warn!(
                rule_id = id,
                error = result.error.as_deref().unwrap_or("unknown"),
                "rule action failed"
            );
        }
        Some(result)
    }

    fn spawn_monitor(self: &Arc<Self>, id: RuleId, every: Duration) -> watch::Sender<bool> {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let engine = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick completes immediately; consume it
            // so the first evaluation happens after one full period.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        // Fully awaited here, so ticks for this rule
                        // never overlap.
                        engine.run_rule_cycle(id).await;
                    }
                }
            }
            tracing::debug!(rule_id = id, "monitor stopped");
        });

        stop_tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use crate::clients::{
        AssetSummary, GlobalStats, PriceQuote, TransactionEntry, TxStatus,
    };
    use crate::error::ClientError;
    use crate::tasks::TaskRegistry;

    struct FixedMarket {
        price: Decimal,
    }

    #[async_trait]
    impl MarketClient for FixedMarket {
        async fn get_price(&self, _symbol: &str) -> Result<PriceQuote, ClientError> {
            Ok(PriceQuote {
                price: self.price,
                change_24h: dec!(0),
                volume_24h: dec!(0),
                market_cap: dec!(0),
            })
        }

        async fn get_top_assets(&self, _limit: usize) -> Result<Vec<AssetSummary>, ClientError> {
            Ok(vec![])
        }

        async fn get_market_stats(&self) -> Result<GlobalStats, ClientError> {
            Ok(GlobalStats {
                total_market_cap_usd: dec!(0),
                total_volume_usd: dec!(0),
                market_cap_change_24h: dec!(0),
            })
        }
    }

    struct FixedChain {
        balance: Decimal,
    }

    #[async_trait]
    impl crate::clients::ChainClient for FixedChain {
        async fn get_balance(&self, _address: &str) -> Result<Decimal, ClientError> {
            Ok(self.balance)
        }

        async fn get_transaction_history(
            &self,
            _address: &str,
        ) -> Result<Vec<TransactionEntry>, ClientError> {
            Ok(vec![])
        }

        async fn get_transaction_status(&self, _hash: &str) -> Result<TxStatus, ClientError> {
            Ok(TxStatus::Confirmed)
        }

        async fn get_gas_price(&self) -> Result<Decimal, ClientError> {
            Ok(dec!(20))
        }

        async fn estimate_contract_gas(
            &self,
            _address: &str,
            _abi: &serde_json::Value,
            _method: &str,
            _args: &[serde_json::Value],
        ) -> Result<Decimal, ClientError> {
            Ok(dec!(50000))
        }
    }

    fn make_engine(price: Decimal) -> Arc<AutomationEngine> {
        let market = Arc::new(FixedMarket { price });
        let chain = Arc::new(FixedChain { balance: dec!(10) });
        let registry = Arc::new(TaskRegistry::with_builtin_tasks(
            chain.clone(),
            market.clone(),
        ));
        AutomationEngine::new(registry, market, chain)
    }

    fn bare_rule(condition: &str) -> AutomationRule {
        AutomationRule {
            condition: condition.to_string(),
            action: "analyze_market".to_string(),
            params: json!({}),
            interval: None,
        }
    }

    #[tokio::test]
    async fn rule_ids_are_monotonic_insertion_indices() {
        let engine = make_engine(dec!(100));
        assert_eq!(engine.add_rule(bare_rule("a")).await, 0);
        assert_eq!(engine.add_rule(bare_rule("b")).await, 1);

        let rules = engine.active_rules().await;
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].0, 1);
    }

    #[tokio::test]
    async fn removed_ids_are_never_reused() {
        let engine = make_engine(dec!(100));
        let first = engine.add_rule(bare_rule("a")).await;
        assert!(engine.remove_rule(first).await);

        let second = engine.add_rule(bare_rule("b")).await;
        assert_eq!(second, first + 1);
    }

    #[tokio::test]
    async fn remove_rule_is_idempotent_and_range_checked() {
        let engine = make_engine(dec!(100));
        let id = engine.add_rule(bare_rule("a")).await;

        assert!(engine.remove_rule(id).await);
        assert!(!engine.remove_rule(id).await);
        assert!(!engine.remove_rule(999).await);
        assert!(engine.active_rules().await.is_empty());
    }

    #[tokio::test]
    async fn price_alert_fires_only_below_threshold() {
        let engine = make_engine(dec!(2500));
        let id = engine.setup_price_alert("eth", dec!(3000), None).await;

        let fired = engine.run_rule_cycle(id).await;
        let result = fired.expect("condition should be met at 2500 < 3000");
        assert!(result.success);

        let quiet_engine = make_engine(dec!(3500));
        let id = quiet_engine.setup_price_alert("eth", dec!(3000), None).await;
        assert!(quiet_engine.run_rule_cycle(id).await.is_none());
    }

    #[tokio::test]
    async fn unknown_condition_never_fires_across_ticks() {
        let engine = make_engine(dec!(1));
        let id = engine.add_rule(bare_rule("bogus_condition:x:y")).await;

        for _ in 0..3 {
            assert!(engine.run_rule_cycle(id).await.is_none());
        }
    }

    #[tokio::test]
    async fn failed_action_does_not_stop_future_cycles() {
        let engine = make_engine(dec!(2500));
        let id = engine
            .add_rule(AutomationRule {
                condition: "price_below_threshold:eth:3000".to_string(),
                action: "no_such_task".to_string(),
                params: json!({}),
                interval: None,
            })
            .await;

        let first = engine.run_rule_cycle(id).await.expect("condition met");
        assert!(!first.success);

        // The next cycle still evaluates and executes.
        let second = engine.run_rule_cycle(id).await.expect("condition met");
        assert!(!second.success);
    }

    #[tokio::test]
    async fn stop_all_monitoring_keeps_rules_queryable() {
        let engine = make_engine(dec!(100));
        engine.setup_price_alert("eth", dec!(3000), None).await;
        engine
            .setup_wallet_monitor("0xabc", dec!(1), None)
            .await;

        engine.stop_all_monitoring().await;

        let rules = engine.active_rules().await;
        assert_eq!(rules.len(), 2);
        assert!(engine.state.lock().await.monitors.is_empty());
    }

    #[tokio::test]
    async fn rules_with_intervals_get_monitors() {
        let engine = make_engine(dec!(2500));
        let id = engine
            .setup_price_alert("eth", dec!(3000), Some(Duration::from_secs(3600)))
            .await;

        assert!(engine.state.lock().await.monitors.contains_key(&id));
        assert!(engine.remove_rule(id).await);
        assert!(engine.state.lock().await.monitors.is_empty());
    }
}

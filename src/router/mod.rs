//! Free-text command routing.
//!
//! The router maps a user utterance to a command through an ordered
//! regex table; the first structural match wins and its capture groups
//! become positional parameters. Every path produces a [`Response`],
//! including unmatched input (fixed fallback) and handler errors
//! (rendered as `"Error: <message>"` chat text, never a raw panic).

use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use serde_json::json;

use crate::automation::AutomationEngine;
use crate::error::{Error, TaskError};
use crate::tasks::{TaskData, TaskRegistry, TaskResult};

/// Chat-shaped reply: a rendered message, the structured payload it was
/// rendered from, and deterministic follow-up suggestions.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub suggestions: Vec<String>,
}

impl Response {
    fn fallback() -> Self {
        Self {
            message: "Sorry, I didn't understand that. Try 'help' for the commands I know."
                .to_string(),
            data: None,
            suggestions: generic_suggestions(),
        }
    }
}

/// Command selected by the pattern table. Handlers are methods on the
/// router keyed by this enum, so the table stays a flat, auditable
/// list of patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    CheckPrice,
    MonitorWallet,
    ExecuteTrade,
    AnalyzeMarket,
    TrackTransaction,
    SetPriceAlert,
    ListRules,
    RemoveRule,
    StopMonitoring,
    Help,
}

/// Ordered pattern table, most specific first. The trailing bare
/// `<symbol> price` form has to stay last or it would shadow other
/// two-word commands.
const PATTERNS: &[(&str, CommandKind)] = &[
    (
        r"(?i)^(?:check\s+)?price\s+of\s+([a-z0-9]+)\s*\??$",
        CommandKind::CheckPrice,
    ),
    (
        r"(?i)^(?:monitor|watch)\s+wallet\s+(\S+)$",
        CommandKind::MonitorWallet,
    ),
    (
        r"(?i)^(buy|sell)\s+([0-9]*\.?[0-9]+)\s+([a-z0-9]+)(?:\s+(below|above)\s+\$?([0-9]*\.?[0-9]+))?$",
        CommandKind::ExecuteTrade,
    ),
    (
        r"(?i)^(?:analyze\s+market|market\s+analysis)$",
        CommandKind::AnalyzeMarket,
    ),
    (
        r"(?i)^(?:track\s+transaction|tx\s+status)\s+(\S+)$",
        CommandKind::TrackTransaction,
    ),
    (
        r"(?i)^alert\s+me\s+when\s+([a-z0-9]+)\s+drops\s+below\s+\$?([0-9]*\.?[0-9]+)$",
        CommandKind::SetPriceAlert,
    ),
    (
        r"(?i)^set\s+price\s+alert\s+for\s+([a-z0-9]+)\s+below\s+\$?([0-9]*\.?[0-9]+)$",
        CommandKind::SetPriceAlert,
    ),
    (
        r"(?i)^(?:show\s+active\s+rules|list\s+rules)$",
        CommandKind::ListRules,
    ),
    (
        r"(?i)^(?:remove|delete)\s+rule\s+#?([0-9]+)$",
        CommandKind::RemoveRule,
    ),
    (r"(?i)^stop\s+monitoring$", CommandKind::StopMonitoring),
    (r"(?i)^help$", CommandKind::Help),
    (r"(?i)^([a-z0-9]+)\s+price\s*\??$", CommandKind::CheckPrice),
];

static COMMAND_TABLE: OnceLock<Vec<(Regex, CommandKind)>> = OnceLock::new();

fn command_table() -> &'static [(Regex, CommandKind)] {
    COMMAND_TABLE.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|(pattern, kind)| Regex::new(pattern).ok().map(|re| (re, *kind)))
            .collect()
    })
}

/// Match an utterance against the pattern table. Returns the command
/// and its captured parameters in pattern order; `None` means the
/// fallback response applies.
pub fn match_command(text: &str) -> Option<(CommandKind, Vec<String>)> {
    let trimmed = text.trim();
    for (regex, kind) in command_table() {
        if let Some(captures) = regex.captures(trimmed) {
            let params = captures
                .iter()
                .skip(1)
                .flatten()
                .map(|group| group.as_str().to_string())
                .collect();
            return Some((*kind, params));
        }
    }
    None
}

/// Alert threshold suggested after a price check: 5% under the current
/// price, floored to a whole unit.
pub(crate) fn alert_threshold(price: Decimal) -> Decimal {
    (price * dec!(0.95)).floor().normalize()
}

fn generic_suggestions() -> Vec<String> {
    vec![
        "help".to_string(),
        "price of btc".to_string(),
        "analyze market".to_string(),
    ]
}

/// Render a failed `TaskResult` as chat text.
fn failure_response(result: TaskResult) -> Response {
    let reason = result
        .error
        .unwrap_or_else(|| "unknown failure".to_string());
    Response {
        message: format!("Error: {}", reason),
        data: None,
        suggestions: generic_suggestions(),
    }
}

fn signed_percent(value: Decimal) -> String {
    if value >= Decimal::ZERO {
        format!("+{}%", value.normalize())
    } else {
        format!("{}%", value.normalize())
    }
}

pub struct Router {
    registry: Arc<TaskRegistry>,
    engine: Arc<AutomationEngine>,
}

impl Router {
    pub fn new(registry: Arc<TaskRegistry>, engine: Arc<AutomationEngine>) -> Self {
        Self { registry, engine }
    }

    /// Route one utterance to a response. This is the whole surface a
    /// channel needs; it never raises.
    pub async fn process_message(&self, text: &str) -> Response {
        let Some((kind, params)) = match_command(text) else {
            tracing::debug!(text = %text, "no command matched");
            return Response::fallback();
        };

        match self.dispatch(kind, &params).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(?kind, error = %err, "command handler failed");
                Response {
                    message: format!("Error: {}", err),
                    data: None,
                    suggestions: generic_suggestions(),
                }
            }
        }
    }

    async fn dispatch(&self, kind: CommandKind, params: &[String]) -> Result<Response, Error> {
        match (kind, params) {
            (CommandKind::CheckPrice, [symbol]) => self.check_price(symbol).await,
            (CommandKind::MonitorWallet, [address]) => self.monitor_wallet(address).await,
            (CommandKind::ExecuteTrade, [side, amount, token, rest @ ..]) => {
                self.execute_trade(side, amount, token, rest).await
            }
            (CommandKind::AnalyzeMarket, _) => self.analyze_market().await,
            (CommandKind::TrackTransaction, [hash]) => self.track_transaction(hash).await,
            (CommandKind::SetPriceAlert, [symbol, threshold]) => {
                self.set_price_alert(symbol, threshold).await
            }
            (CommandKind::ListRules, _) => Ok(self.list_rules().await),
            (CommandKind::RemoveRule, [id]) => self.remove_rule(id).await,
            (CommandKind::StopMonitoring, _) => Ok(self.stop_monitoring().await),
            (CommandKind::Help, _) => Ok(help_response()),
            // The table and the handler arities are kept in sync; a
            // mismatch degrades to the fallback rather than panicking.
            _ => Ok(Response::fallback()),
        }
    }

    async fn check_price(&self, symbol: &str) -> Result<Response, Error> {
        let result = self
            .registry
            .execute_task("check_price", json!({ "symbol": symbol.to_lowercase() }))
            .await;
        let Some(TaskData::Price(report)) = result.data else {
            return Ok(failure_response(result));
        };

        let data = serde_json::to_value(&report).ok();
        let message = format!(
            "{} is trading at ${} ({} over 24h). {}",
            report.symbol.to_uppercase(),
            report.price.normalize(),
            signed_percent(report.change_24h),
            report.recommendation,
        );
        let suggestions = vec![
            format!(
                "set price alert for {} below {}",
                report.symbol,
                alert_threshold(report.price)
            ),
            format!("buy 0.1 {}", report.symbol),
            "analyze market".to_string(),
        ];
        Ok(Response {
            message,
            data,
            suggestions,
        })
    }

    async fn monitor_wallet(&self, address: &str) -> Result<Response, Error> {
        let result = self
            .registry
            .execute_task("monitor_wallet", json!({ "address": address }))
            .await;
        let Some(TaskData::Wallet(report)) = result.data else {
            return Ok(failure_response(result));
        };

        let data = serde_json::to_value(&report).ok();
        let message = format!(
            "Wallet {}: balance {} ETH, {} transactions on record. {}",
            report.address,
            report.balance.normalize(),
            report.transaction_count,
            report.security_status,
        );
        Ok(Response {
            message,
            data,
            suggestions: vec![
                "show active rules".to_string(),
                "analyze market".to_string(),
            ],
        })
    }

    async fn execute_trade(
        &self,
        side: &str,
        amount: &str,
        token: &str,
        threshold: &[String],
    ) -> Result<Response, Error> {
        let mut task_params = json!({
            "trade_type": side.to_lowercase(),
            "token": token.to_lowercase(),
            "amount": amount,
        });
        // The optional captures arrive as [direction, threshold]; the
        // task applies the threshold according to the trade side.
        if let [_, value] = threshold {
            task_params["price_threshold"] = json!(value);
        }

        let result = self.registry.execute_task("execute_trade", task_params).await;
        let Some(TaskData::Trade(record)) = result.data else {
            return Ok(failure_response(result));
        };

        let data = serde_json::to_value(&record).ok();
        let message = format!(
            "Simulated {} of {} {} at ${}. No real order was placed.",
            record.trade_type.as_str(),
            record.amount.normalize(),
            record.token.to_uppercase(),
            record.execution_price.normalize(),
        );
        Ok(Response {
            message,
            data,
            suggestions: vec![
                format!("price of {}", record.token),
                "show active rules".to_string(),
            ],
        })
    }

    async fn analyze_market(&self) -> Result<Response, Error> {
        let result = self
            .registry
            .execute_task("analyze_market", json!({}))
            .await;
        let Some(TaskData::Market(report)) = result.data else {
            return Ok(failure_response(result));
        };

        let data = serde_json::to_value(&report).ok();
        let performers = if report.top_performers.is_empty() {
            "none".to_string()
        } else {
            report
                .top_performers
                .iter()
                .map(|asset| {
                    format!(
                        "{} ({})",
                        asset.symbol.to_uppercase(),
                        signed_percent(asset.change_24h)
                    )
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        let message = format!(
            "Market sentiment: {} ({} market cap over 24h). Top performers: {}. {}",
            report.sentiment.as_str(),
            signed_percent(report.market_cap_change_24h),
            performers,
            report.recommendation,
        );
        Ok(Response {
            message,
            data,
            suggestions: vec!["price of btc".to_string(), "price of eth".to_string()],
        })
    }

    async fn track_transaction(&self, hash: &str) -> Result<Response, Error> {
        let result = self
            .registry
            .execute_task("track_transaction", json!({ "tx_hash": hash }))
            .await;
        let Some(TaskData::Transaction(report)) = result.data else {
            return Ok(failure_response(result));
        };

        let data = serde_json::to_value(&report).ok();
        let message = format!(
            "Transaction {}: {}. Network gas price {} gwei. {}",
            report.tx_hash,
            report.status.as_str(),
            report.gas_price_gwei.normalize(),
            report.recommendation,
        );
        Ok(Response {
            message,
            data,
            suggestions: vec![format!("tx status {}", report.tx_hash)],
        })
    }

    async fn set_price_alert(&self, symbol: &str, threshold: &str) -> Result<Response, Error> {
        let threshold = Decimal::from_str(threshold)
            .map_err(|e| TaskError::InvalidParameters(e.to_string()))
            .map_err(Error::from)?;
        let symbol = symbol.to_lowercase();

        let id = self.engine.setup_price_alert(&symbol, threshold, None).await;
        let message = format!(
            "Price alert #{} set: will simulate a 0.1 {} buy when the price drops below ${}.",
            id,
            symbol.to_uppercase(),
            threshold.normalize(),
        );
        Ok(Response {
            message,
            data: Some(json!({ "rule_id": id })),
            suggestions: vec![
                "show active rules".to_string(),
                format!("remove rule {}", id),
            ],
        })
    }

    async fn list_rules(&self) -> Response {
        let rules = self.engine.active_rules().await;
        if rules.is_empty() {
            return Response {
                message: "No active rules.".to_string(),
                data: None,
                suggestions: vec![
                    "alert me when eth drops below 3000".to_string(),
                    "help".to_string(),
                ],
            };
        }

        let lines: Vec<String> = rules
            .iter()
            .map(|(id, rule)| {
                let cadence = match rule.interval {
                    Some(every) => format!("every {}s", every.as_secs()),
                    None => "manual".to_string(),
                };
                format!("#{} {} -> {} ({})", id, rule.condition, rule.action, cadence)
            })
            .collect();
        Response {
            message: format!("Active rules:\n{}", lines.join("\n")),
            data: serde_json::to_value(&rules).ok(),
            suggestions: vec![format!("remove rule {}", rules[0].0)],
        }
    }

    async fn remove_rule(&self, id: &str) -> Result<Response, Error> {
        let id: u64 = id
            .parse()
            .map_err(|_| Error::from(TaskError::InvalidParameters(format!("bad rule id '{}'", id))))?;

        let message = if self.engine.remove_rule(id).await {
            format!("Rule {} removed.", id)
        } else {
            format!("No rule with id {}.", id)
        };
        Ok(Response {
            message,
            data: None,
            suggestions: vec!["show active rules".to_string()],
        })
    }

    async fn stop_monitoring(&self) -> Response {
        self.engine.stop_all_monitoring().await;
        Response {
            message: "All monitoring stopped. Rules are kept but inactive.".to_string(),
            data: None,
            suggestions: vec!["show active rules".to_string()],
        }
    }
}

fn help_response() -> Response {
    let message = "\
I understand these commands:
  check price of <symbol> / price of <symbol> / <symbol> price
  monitor wallet <address> / watch wallet <address>
  buy|sell <amount> <token> [below|above <price>]
  analyze market / market analysis
  track transaction <hash> / tx status <hash>
  alert me when <symbol> drops below <price>
  set price alert for <symbol> below <price>
  show active rules / list rules
  remove rule <id> / delete rule <id>
  stop monitoring"
        .to_string();
    Response {
        message,
        data: None,
        suggestions: vec!["price of btc".to_string(), "analyze market".to_string()],
    }
}

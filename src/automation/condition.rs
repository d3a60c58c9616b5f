//! Colon-delimited condition language for automation rules.
//!
//! A condition is `type:arg1:arg2:...`. Unknown types and malformed
//! arguments are fail-closed: they parse to [`Condition::Unknown`] and
//! never evaluate true, rather than erroring.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::clients::{ChainClient, MarketClient};

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// True iff a price check for `symbol` succeeds and the price is
    /// strictly below `threshold`.
    PriceBelow { symbol: String, threshold: Decimal },
    /// True iff a balance check for `address` succeeds and the balance
    /// is strictly above `min_balance`.
    BalanceAbove { address: String, min_balance: Decimal },
    /// Anything unrecognized; always evaluates false.
    Unknown { raw: String },
}

impl Condition {
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split(':').collect();
        match parts.as_slice() {
            ["price_below_threshold", symbol, threshold] => {
                match Decimal::from_str(threshold) {
                    Ok(threshold) => Self::PriceBelow {
                        symbol: symbol.to_string(),
                        threshold,
                    },
                    Err(_) => Self::unknown(raw),
                }
            }
            ["wallet_balance_above", address, min_balance] => {
                match Decimal::from_str(min_balance) {
                    Ok(min_balance) => Self::BalanceAbove {
                        address: address.to_string(),
                        min_balance,
                    },
                    Err(_) => Self::unknown(raw),
                }
            }
            _ => Self::unknown(raw),
        }
    }

    fn unknown(raw: &str) -> Self {
        Self::Unknown {
            raw: raw.to_string(),
        }
    }

    /// Evaluate against the capability clients. Upstream failures count
    /// as "not met this cycle" and are logged, never surfaced.
    pub async fn evaluate(
        &self,
        market: &dyn MarketClient,
        chain: &dyn ChainClient,
    ) -> bool {
        match self {
            Self::PriceBelow { symbol, threshold } => {
                match market.get_price(symbol).await {
                    Ok(quote) => quote.price < *threshold,
                    Err(err) => {
                        tracing::warn!(symbol = %symbol, error = %err, "price condition check failed");
                        false
                    }
                }
            }
            Self::BalanceAbove {
                address,
                min_balance,
            } => match chain.get_balance(address).await {
                Ok(balance) => balance > *min_balance,
                Err(err) => {
                    tracing::warn!(address = %address, error = %err, "balance condition check failed");
                    false
                }
            },
            Self::Unknown { raw } => {
                tracing::debug!(condition = %raw, "unknown condition type, treating as not met");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_price_condition() {
        let condition = Condition::parse("price_below_threshold:eth:3000");
        assert_eq!(
            condition,
            Condition::PriceBelow {
                symbol: "eth".to_string(),
                threshold: dec!(3000),
            }
        );
    }

    #[test]
    fn parses_balance_condition() {
        let condition = Condition::parse("wallet_balance_above:0xabc:1.5");
        assert_eq!(
            condition,
            Condition::BalanceAbove {
                address: "0xabc".to_string(),
                min_balance: dec!(1.5),
            }
        );
    }

    #[test]
    fn unknown_types_and_malformed_args_fail_closed() {
        assert!(matches!(
            Condition::parse("bogus_condition:x:y"),
            Condition::Unknown { .. }
        ));
        assert!(matches!(
            Condition::parse("price_below_threshold:eth"),
            Condition::Unknown { .. }
        ));
        assert!(matches!(
            Condition::parse("price_below_threshold:eth:not-a-number"),
            Condition::Unknown { .. }
        ));
        assert!(matches!(Condition::parse(""), Condition::Unknown { .. }));
    }
}

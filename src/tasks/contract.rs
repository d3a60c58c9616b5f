//! Contract-call gas estimation with an unsafe-approval guard.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::ChainClient;
use crate::error::TaskError;
use crate::tasks::{Task, TaskData, parse_params};

const INFINITE_APPROVAL_ERROR: &str =
    "Infinite approval detected - blocking unsafe 'approve' call";

pub struct SmartContractInteractionTask {
    chain: Arc<dyn ChainClient>,
}

#[derive(Debug, Deserialize)]
struct ContractParams {
    address: String,
    abi: Value,
    method: String,
    #[serde(default)]
    params: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContractCallEstimate {
    pub address: String,
    pub method: String,
    pub gas_estimate: Decimal,
    pub gas_price_gwei: Decimal,
    pub estimated_cost: String,
}

/// True for the maximum-allowance sentinel: an all-`f` hex value
/// (max uint256 or an all-`f` address).
pub(crate) fn is_unlimited_value(value: &Value) -> bool {
    let Some(raw) = value.as_str() else {
        return false;
    };
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    stripped.len() >= 40 && stripped.chars().all(|c| c == 'f' || c == 'F')
}

fn validate_call(method: &str, params: &[Value]) -> Result<(), TaskError> {
    if method == "approve" && params.iter().any(is_unlimited_value) {
        return Err(TaskError::Validation(INFINITE_APPROVAL_ERROR.to_string()));
    }
    Ok(())
}

impl SmartContractInteractionTask {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Task for SmartContractInteractionTask {
    fn name(&self) -> &'static str {
        "smart_contract_interaction"
    }

    async fn execute(&self, params: Value) -> Result<TaskData, TaskError> {
        let params: ContractParams = parse_params(params)?;

        // Blocked calls must not reach the chain at all, so the guard
        // runs before the gas estimate.
        validate_call(&params.method, &params.params)?;

        let gas_estimate = self
            .chain
            .estimate_contract_gas(&params.address, &params.abi, &params.method, &params.params)
            .await?;
        let gas_price_gwei = self.chain.get_gas_price().await?;
        let cost_gwei = (gas_estimate * gas_price_gwei).normalize();

        Ok(TaskData::Contract(ContractCallEstimate {
            address: params.address,
            method: params.method,
            gas_estimate,
            gas_price_gwei,
            estimated_cost: format!("{} gwei", cost_gwei),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_all_f_address_and_max_uint() {
        assert!(is_unlimited_value(&json!(
            "0xffffffffffffffffffffffffffffffffffffffff"
        )));
        assert!(is_unlimited_value(&json!(
            "0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
        )));
        assert!(!is_unlimited_value(&json!(
            "0x1111111111111111111111111111111111111111"
        )));
        // Too short to be an address or a uint256.
        assert!(!is_unlimited_value(&json!("0xffff")));
        assert!(!is_unlimited_value(&json!(1000)));
    }

    #[test]
    fn blocks_infinite_approve_only() {
        let unlimited = json!("0xffffffffffffffffffffffffffffffffffffffff");
        let err = validate_call("approve", &[json!("0xspender"), unlimited.clone()]).unwrap_err();
        assert_eq!(err.to_string(), INFINITE_APPROVAL_ERROR);

        // Same sentinel through a different method passes validation.
        assert!(validate_call("transfer", &[unlimited]).is_ok());
        assert!(validate_call("approve", &[json!("0xspender"), json!("1000")]).is_ok());
    }
}

//! Ethereum-style JSON-RPC chain client.
//!
//! Transaction history is not part of standard JSON-RPC, so it goes
//! through an Etherscan-compatible explorer endpoint instead. Both
//! endpoints come from [`Config`](crate::config::Config).

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use sha3::{Digest, Keccak256};

use crate::clients::{ChainClient, TransactionEntry, TxStatus};
use crate::config::Config;
use crate::error::ClientError;

/// Decimal digits in one ether (wei scale).
const WEI_SCALE: u32 = 18;
/// Decimal digits in one gwei.
const GWEI_SCALE: u32 = 9;

pub struct JsonRpcChainClient {
    http: reqwest::Client,
    rpc_url: String,
    explorer_api_url: String,
    explorer_api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ExplorerEnvelope {
    #[serde(default)]
    result: Vec<ExplorerTx>,
}

#[derive(Debug, Deserialize)]
struct ExplorerTx {
    hash: String,
    from: String,
    #[serde(default)]
    to: String,
    /// Value in wei, decimal string.
    value: String,
    #[serde(default, rename = "timeStamp")]
    time_stamp: Option<String>,
}

impl JsonRpcChainClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url: config.rpc_url.clone(),
            explorer_api_url: config.explorer_api_url.clone(),
            explorer_api_key: config.explorer_api_key.clone(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let envelope: RpcEnvelope = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = envelope.error {
            return Err(ClientError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    async fn get_balance(&self, address: &str) -> Result<Decimal, ClientError> {
        let result = self
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        let wei = hex_quantity(&result)?;
        scaled_decimal(wei, WEI_SCALE)
    }

    async fn get_transaction_history(
        &self,
        address: &str,
    ) -> Result<Vec<TransactionEntry>, ClientError> {
        let mut request = self.http.get(&self.explorer_api_url).query(&[
            ("module", "account"),
            ("action", "txlist"),
            ("address", address),
            ("sort", "desc"),
        ]);
        if let Some(ref key) = self.explorer_api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }
        let envelope: ExplorerEnvelope = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        envelope
            .result
            .into_iter()
            .map(|tx| {
                let wei: u128 = tx
                    .value
                    .parse()
                    .map_err(|_| ClientError::Decode(format!("bad wei value '{}'", tx.value)))?;
                Ok(TransactionEntry {
                    hash: tx.hash,
                    from: tx.from,
                    to: (!tx.to.is_empty()).then_some(tx.to),
                    value: scaled_decimal(wei, WEI_SCALE)?,
                    timestamp: tx.time_stamp.and_then(|ts| ts.parse().ok()),
                })
            })
            .collect()
    }

    async fn get_transaction_status(&self, hash: &str) -> Result<TxStatus, ClientError> {
        let receipt = self
            .call("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if let Some(status) = receipt.get("status").and_then(Value::as_str) {
            return Ok(if status == "0x1" {
                TxStatus::Confirmed
            } else {
                TxStatus::Failed
            });
        }

        // No receipt yet: the tx is either still in the mempool or unknown.
        let tx = self.call("eth_getTransactionByHash", json!([hash])).await?;
        if tx.is_null() {
            Ok(TxStatus::NotFound)
        } else {
            Ok(TxStatus::Pending)
        }
    }

    async fn get_gas_price(&self) -> Result<Decimal, ClientError> {
        let result = self.call("eth_gasPrice", json!([])).await?;
        let wei = hex_quantity(&result)?;
        scaled_decimal(wei, GWEI_SCALE)
    }

    async fn estimate_contract_gas(
        &self,
        address: &str,
        abi: &Value,
        method: &str,
        args: &[Value],
    ) -> Result<Decimal, ClientError> {
        let data = encode_call_data(abi, method, args)?;
        let result = self
            .call("eth_estimateGas", json!([{ "to": address, "data": data }]))
            .await?;
        let gas = hex_quantity(&result)?;
        scaled_decimal(gas, 0)
    }
}

fn hex_quantity(value: &Value) -> Result<u128, ClientError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ClientError::Decode(format!("expected hex quantity, got {}", value)))?;
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    u128::from_str_radix(stripped, 16)
        .map_err(|_| ClientError::Decode(format!("bad hex quantity '{}'", raw)))
}

fn scaled_decimal(value: u128, scale: u32) -> Result<Decimal, ClientError> {
    let mantissa = i128::try_from(value)
        .map_err(|_| ClientError::Decode("quantity exceeds representable range".to_string()))?;
    Decimal::try_from_i128_with_scale(mantissa, scale)
        .map_err(|_| ClientError::Decode("quantity exceeds representable range".to_string()))
}

/// Build `eth_estimateGas` call data from an ABI fragment.
///
/// Selector is the first four bytes of keccak256 of the canonical
/// signature; static arguments are left-stripped of `0x` and padded to
/// 32 bytes. Dynamic types are not needed by any built-in task.
fn encode_call_data(abi: &Value, method: &str, args: &[Value]) -> Result<String, ClientError> {
    let types = abi_input_types(abi, method)?;
    let signature = format!("{}({})", method, types.join(","));

    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    let digest = hasher.finalize();

    let mut data = String::with_capacity(10 + args.len() * 64);
    data.push_str("0x");
    for byte in &digest[..4] {
        data.push_str(&format!("{:02x}", byte));
    }
    for arg in args {
        data.push_str(&encode_static_arg(arg)?);
    }
    Ok(data)
}

fn abi_input_types(abi: &Value, method: &str) -> Result<Vec<String>, ClientError> {
    let entries = abi
        .as_array()
        .ok_or_else(|| ClientError::Decode("ABI must be a JSON array".to_string()))?;
    let entry = entries
        .iter()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(method))
        .ok_or_else(|| ClientError::NotFound(format!("method '{}' in ABI", method)))?;

    Ok(entry
        .get("inputs")
        .and_then(Value::as_array)
        .map(|inputs| {
            inputs
                .iter()
                .filter_map(|input| input.get("type").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

fn encode_static_arg(arg: &Value) -> Result<String, ClientError> {
    let word = match arg {
        // Only 0x-prefixed strings are hex; a bare "1000" is decimal.
        Value::String(s) => match s.strip_prefix("0x") {
            Some(stripped)
                if !stripped.is_empty()
                    && stripped.chars().all(|c| c.is_ascii_hexdigit()) =>
            {
                stripped.to_ascii_lowercase()
            }
            Some(_) => {
                return Err(ClientError::Decode(format!("unencodable argument '{}'", s)));
            }
            None => {
                let n: u128 = s
                    .parse()
                    .map_err(|_| ClientError::Decode(format!("unencodable argument '{}'", s)))?;
                format!("{:x}", n)
            }
        },
        Value::Number(n) => {
            let n = n
                .as_u64()
                .ok_or_else(|| ClientError::Decode(format!("unencodable argument {}", n)))?;
            format!("{:x}", n)
        }
        Value::Bool(b) => format!("{:x}", u8::from(*b)),
        other => {
            return Err(ClientError::Decode(format!(
                "unencodable argument {}",
                other
            )));
        }
    };
    if word.len() > 64 {
        return Err(ClientError::Decode("argument wider than 32 bytes".to_string()));
    }
    Ok(format!("{:0>64}", word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(hex_quantity(&json!("0xde0b6b3a7640000")).unwrap(), 10u128.pow(18));
        assert!(hex_quantity(&json!(42)).is_err());
        assert!(hex_quantity(&json!("0xzz")).is_err());
    }

    #[test]
    fn scales_wei_to_ether() {
        let one_ether = scaled_decimal(10u128.pow(18), WEI_SCALE).unwrap();
        assert_eq!(one_ether.normalize(), dec!(1));
    }

    #[test]
    fn encodes_approve_call_data() {
        let abi = json!([{
            "name": "approve",
            "type": "function",
            "inputs": [
                { "name": "spender", "type": "address" },
                { "name": "amount", "type": "uint256" }
            ]
        }]);
        let args = vec![
            json!("0x1111111111111111111111111111111111111111"),
            json!("1000"),
        ];
        let data = encode_call_data(&abi, "approve", &args).unwrap();

        // keccak256("approve(address,uint256)")[..4] == 0x095ea7b3
        assert!(data.starts_with("0x095ea7b3"));
        assert_eq!(data.len(), 2 + 8 + 64 * 2);
    }

    #[test]
    fn decimal_strings_encode_as_decimal() {
        // "1000" is 0x3e8, not 0x1000.
        let word = encode_static_arg(&json!("1000")).unwrap();
        assert!(word.ends_with("3e8"));
        assert_eq!(word.len(), 64);
    }

    #[test]
    fn unknown_abi_method_is_an_error() {
        let abi = json!([{ "name": "transfer", "inputs": [] }]);
        let err = encode_call_data(&abi, "approve", &[]).unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }
}

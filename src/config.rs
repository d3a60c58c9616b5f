//! Configuration for ChainPilot.
//!
//! Everything is env-var driven with working defaults, loaded once at
//! startup (after `dotenvy::dotenv()`). Endpoint URLs are validated
//! eagerly so a typo fails at boot instead of on the first request.

use url::Url;

use crate::error::ConfigError;

const DEFAULT_RPC_URL: &str = "https://rpc.ankr.com/eth";
const DEFAULT_EXPLORER_API_URL: &str = "https://api.etherscan.io/api";
const DEFAULT_MARKET_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Main configuration for the assistant.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ethereum-style JSON-RPC endpoint.
    pub rpc_url: String,
    /// Explorer REST endpoint used for transaction history.
    pub explorer_api_url: String,
    /// Optional explorer API key.
    pub explorer_api_key: Option<String>,
    /// Market-data REST endpoint (CoinGecko-compatible).
    pub market_api_url: String,
    /// Optional market-data API key.
    pub market_api_key: Option<String>,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            rpc_url: env_or("CHAINPILOT_RPC_URL", DEFAULT_RPC_URL),
            explorer_api_url: env_or("CHAINPILOT_EXPLORER_API_URL", DEFAULT_EXPLORER_API_URL),
            explorer_api_key: optional_env("CHAINPILOT_EXPLORER_API_KEY"),
            market_api_url: env_or("CHAINPILOT_MARKET_API_URL", DEFAULT_MARKET_API_URL),
            market_api_key: optional_env("CHAINPILOT_MARKET_API_KEY"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_url("CHAINPILOT_RPC_URL", &self.rpc_url)?;
        validate_url("CHAINPILOT_EXPLORER_API_URL", &self.explorer_api_url)?;
        validate_url("CHAINPILOT_MARKET_API_URL", &self.market_api_url)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            explorer_api_url: DEFAULT_EXPLORER_API_URL.to_string(),
            explorer_api_key: None,
            market_api_url: DEFAULT_MARKET_API_URL.to_string(),
            market_api_key: None,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn validate_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_http_scheme() {
        let config = Config {
            rpc_url: "ftp://example.com".to_string(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_garbage_url() {
        let config = Config {
            market_api_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}

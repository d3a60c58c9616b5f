//! Error types for ChainPilot.

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability-client errors (blockchain RPC, market data).
///
/// The core treats these as opaque upstream failures beyond their
/// message text; it never retries.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Task execution errors, converted to `TaskResult.error` text at the
/// registry boundary. Nothing above the registry ever receives one of
/// these as a raised error.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task '{name}' not found")]
    NotFound { name: String },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    // Business-rule rejections carry their message verbatim; callers
    // match on the text (e.g. "Price above threshold").
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Upstream(#[from] ClientError),
}

/// Result type alias for the assistant.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_render_verbatim() {
        let err = TaskError::Validation("Price above threshold".to_string());
        assert_eq!(err.to_string(), "Price above threshold");
    }

    #[test]
    fn not_found_names_the_task() {
        let err = TaskError::NotFound {
            name: "frobnicate".to_string(),
        };
        assert_eq!(err.to_string(), "Task 'frobnicate' not found");
    }

    #[test]
    fn upstream_errors_pass_through_their_message() {
        let err = TaskError::from(ClientError::Rpc {
            code: -32000,
            message: "execution reverted".to_string(),
        });
        assert_eq!(err.to_string(), "RPC error -32000: execution reverted");
    }
}

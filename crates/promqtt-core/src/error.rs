//! Error types for bridge configuration.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while validating a `BridgeConfig`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("must specify broker url")]
    MissingBroker,

    #[error("unsupported broker scheme '{0}' (expected tcp:// or mqtt://)")]
    UnsupportedScheme(String),

    #[error("invalid broker address '{addr}': {reason}")]
    InvalidBroker { addr: String, reason: String },

    #[error("invalid listen address '{addr}': {reason}")]
    InvalidListen { addr: String, reason: String },

    #[error("client id must not be empty")]
    EmptyClientId,

    #[error("keep-alive must be at least one second")]
    ZeroKeepAlive,

    #[error("invalid reconnect backoff bounds: min {min}s, max {max}s")]
    ReconnectBounds { min: u64, max: u64 },
}

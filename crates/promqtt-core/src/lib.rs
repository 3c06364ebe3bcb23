//! promqtt-core — configuration shared by the promqtt bridge crates.
//!
//! `BridgeConfig` is assembled from built-in defaults, an optional
//! `promqtt.toml`, and command-line overrides applied by the daemon.

pub mod config;
pub mod error;

pub use config::{BridgeConfig, BrokerAddr};
pub use error::{ConfigError, ConfigResult};

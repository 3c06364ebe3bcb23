//! promqtt.toml configuration parser.

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default HTTP listen address.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:9337";

/// Port used when the broker address omits one.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

const CLIENT_ID_PREFIX: &str = "promqtt";

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Broker address, e.g. `tcp://localhost:1883`.
    pub broker: String,
    pub client_id: String,
    pub listen: String,
    pub verbose: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    pub reconnect_min_secs: u64,
    pub reconnect_max_secs: u64,
    pub log_json: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            broker: String::new(),
            client_id: default_client_id(),
            listen: DEFAULT_LISTEN.to_string(),
            verbose: false,
            username: None,
            password: None,
            keep_alive_secs: 30,
            reconnect_min_secs: 1,
            reconnect_max_secs: 60,
            log_json: false,
        }
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("broker", &self.broker)
            .field("client_id", &self.client_id)
            .field("listen", &self.listen)
            .field("verbose", &self.verbose)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("keep_alive_secs", &self.keep_alive_secs)
            .field("reconnect_min_secs", &self.reconnect_min_secs)
            .field("reconnect_max_secs", &self.reconnect_max_secs)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl BridgeConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: BridgeConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field that would otherwise fail late, at connect or bind time.
    pub fn validate(&self) -> ConfigResult<()> {
        self.broker_addr()?;
        self.listen_addr()?;
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::EmptyClientId);
        }
        if self.keep_alive_secs == 0 {
            return Err(ConfigError::ZeroKeepAlive);
        }
        if self.reconnect_min_secs == 0 || self.reconnect_min_secs > self.reconnect_max_secs {
            return Err(ConfigError::ReconnectBounds {
                min: self.reconnect_min_secs,
                max: self.reconnect_max_secs,
            });
        }
        Ok(())
    }

    pub fn broker_addr(&self) -> ConfigResult<BrokerAddr> {
        self.broker.parse()
    }

    /// Parse the listen address. A bare `:port` binds all interfaces.
    pub fn listen_addr(&self) -> ConfigResult<SocketAddr> {
        let addr = self.listen.trim();
        let normalized = match addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => addr.to_string(),
        };
        normalized
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidListen {
                addr: self.listen.clone(),
                reason: e.to_string(),
            })
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.reconnect_min_secs),
            Duration::from_secs(self.reconnect_max_secs),
        )
    }
}

/// Host and port of the MQTT broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddr {
    pub host: String,
    pub port: u16,
}

impl FromStr for BrokerAddr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingBroker);
        }

        let rest = match raw.split_once("://") {
            Some((scheme, rest)) => match scheme.to_ascii_lowercase().as_str() {
                "tcp" | "mqtt" => rest,
                other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
            },
            None => raw,
        };
        let rest = rest.trim_end_matches('/');

        let invalid = |reason: &str| ConfigError::InvalidBroker {
            addr: raw.to_string(),
            reason: reason.to_string(),
        };

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            // IPv6 literal: [::1]:1883
            let (host, tail) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid("unterminated '[' in host"))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port).ok_or_else(|| invalid("bad port"))?,
                None if tail.is_empty() => DEFAULT_MQTT_PORT,
                None => return Err(invalid("unexpected text after host")),
            };
            (host, port)
        } else {
            match rest.rsplit_once(':') {
                Some((host, port)) => (host, parse_port(port).ok_or_else(|| invalid("bad port"))?),
                None => (rest, DEFAULT_MQTT_PORT),
            }
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for BrokerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "tcp://[{}]:{}", self.host, self.port)
        } else {
            write!(f, "tcp://{}:{}", self.host, self.port)
        }
    }
}

fn parse_port(s: &str) -> Option<u16> {
    s.parse::<u16>().ok().filter(|p| *p != 0)
}

/// `promqtt@<hostname>`, or plain `promqtt` when the hostname is unknown.
fn default_client_id() -> String {
    match hostname() {
        Some(host) => format!("{CLIENT_ID_PREFIX}@{host}"),
        None => CLIENT_ID_PREFIX.to_string(),
    }
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/proc/sys/kernel/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

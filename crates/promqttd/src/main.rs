//! promqttd — the promqtt daemon.
//!
//! Single binary that assembles the bridge:
//! - Retained store (latest payload per topic)
//! - MQTT session subscribed to `#`
//! - HTTP API: `/mqtt` extraction queries and `/metrics`
//!
//! # Usage
//!
//! ```text
//! promqttd tcp://localhost:1883 --listen :9337
//! curl 'http://localhost:9337/mqtt?topic=^sensors/&regex=(?P<value>[0-9.]+)'
//! ```

mod bridge;
mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use promqtt_core::BridgeConfig;

#[derive(Parser, Debug)]
#[command(
    name = "promqttd",
    about = "Expose retained MQTT values as Prometheus metrics",
    version
)]
struct Cli {
    /// Broker address, e.g. tcp://localhost:1883. Overrides the config file.
    broker: Option<String>,

    /// Path to a promqtt.toml configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    listen: Option<String>,

    /// MQTT client id (default: promqtt@<hostname>).
    #[arg(long)]
    client_id: Option<String>,

    /// Verbose logging, including MQTT client internals.
    #[arg(short, long)]
    verbose: bool,

    /// MQTT username.
    #[arg(long)]
    username: Option<String>,

    /// MQTT password.
    #[arg(long)]
    password: Option<String>,

    /// MQTT keep-alive in seconds.
    #[arg(long)]
    keep_alive: Option<u64>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Layer flags over the config file (or defaults) and validate.
    fn into_config(self) -> anyhow::Result<BridgeConfig> {
        let mut config = match self.config {
            Some(ref path) => BridgeConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => BridgeConfig::default(),
        };

        if let Some(broker) = self.broker {
            config.broker = broker;
        }
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(client_id) = self.client_id {
            config.client_id = client_id;
        }
        if let Some(username) = self.username {
            config.username = Some(username);
        }
        if let Some(password) = self.password {
            config.password = Some(password);
        }
        if let Some(keep_alive) = self.keep_alive {
            config.keep_alive_secs = keep_alive;
        }
        config.verbose |= self.verbose;
        config.log_json |= self.log_json;

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;

    logging::init(config.verbose, config.log_json);

    bridge::run_bridge(config).await
}

//! MQTT session — drives the rumqttc event loop and feeds the adapter.

use std::time::Duration;

use promqtt_core::{BridgeConfig, BrokerAddr, ConfigError};
use promqtt_metrics::BridgeMetrics;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, SubscribeReasonCode};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::adapter::IngestAdapter;
use crate::backoff::ReconnectBackoff;

/// Wildcard filter covering every topic on the broker.
pub const SUBSCRIBE_ALL: &str = "#";

/// Capacity of the request channel between `AsyncClient` and the event loop.
const REQUEST_CAPACITY: usize = 64;

/// How long to keep polling after a DISCONNECT so it reaches the broker.
const DISCONNECT_FLUSH: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to connect to broker at {broker}: {source}")]
    Connect {
        broker: BrokerAddr,
        #[source]
        source: rumqttc::ConnectionError,
    },

    #[error("failed to subscribe to all topics: {0}")]
    Subscribe(#[from] rumqttc::ClientError),

    #[error("broker rejected the subscription to '#'")]
    SubscribeRejected,
}

/// One long-lived connection to the broker, subscribed to every topic.
pub struct MqttSession {
    options: MqttOptions,
    broker: BrokerAddr,
    adapter: IngestAdapter,
    metrics: Option<BridgeMetrics>,
    backoff: ReconnectBackoff,
    /// Set once the first CONNACK arrives; later failures are retried.
    ever_connected: bool,
}

impl MqttSession {
    pub fn new(config: &BridgeConfig, adapter: IngestAdapter) -> Result<Self, SessionError> {
        let broker = config.broker_addr()?;

        let mut options = MqttOptions::new(config.client_id.clone(), broker.host.clone(), broker.port);
        options.set_keep_alive(config.keep_alive());
        options.set_clean_session(true);
        if let Some(ref username) = config.username {
            options.set_credentials(username.clone(), config.password.clone().unwrap_or_default());
        }

        let (min, max) = config.reconnect_bounds();

        Ok(Self {
            options,
            broker,
            adapter,
            metrics: None,
            backoff: ReconnectBackoff::new(min, max),
            ever_connected: false,
        })
    }

    pub fn with_metrics(mut self, metrics: BridgeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn broker(&self) -> &BrokerAddr {
        &self.broker
    }

    pub fn options(&self) -> &MqttOptions {
        &self.options
    }

    /// Run until `shutdown` fires or a fatal error occurs.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), SessionError> {
        if *shutdown.borrow() {
            return Ok(());
        }

        let (client, mut eventloop) = AsyncClient::new(self.options.clone(), REQUEST_CAPACITY);
        info!(broker = %self.broker, client_id = %self.options.client_id(), "connecting to broker");

        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(event) => self.handle_event(&client, event)?,
                    Err(e) => {
                        if !self.ever_connected {
                            return Err(SessionError::Connect {
                                broker: self.broker.clone(),
                                source: e,
                            });
                        }

                        self.set_connected(false);
                        let delay = self.backoff.record_failure();
                        warn!(
                            error = %e,
                            attempt = self.backoff.consecutive_failures(),
                            retry_in_ms = delay.as_millis() as u64,
                            "connection lost"
                        );

                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = shutdown.changed() => break,
                        }
                    }
                },
                _ = shutdown.changed() => {
                    info!("mqtt session shutting down");
                    if client.try_disconnect().is_ok() {
                        // Drive the loop briefly so the DISCONNECT is written.
                        let _ = tokio::time::timeout(DISCONNECT_FLUSH, async {
                            while eventloop.poll().await.is_ok() {}
                        })
                        .await;
                    }
                    break;
                }
            }
        }

        self.set_connected(false);
        Ok(())
    }

    pub(crate) fn handle_event(&mut self, client: &AsyncClient, event: Event) -> Result<(), SessionError> {
        match event {
            Event::Incoming(Packet::Publish(publish)) => {
                self.adapter.on_message(&publish.topic, &publish.payload);
            }
            Event::Incoming(Packet::ConnAck(_)) => {
                if self.ever_connected {
                    info!(broker = %self.broker, "reconnected to broker");
                    if let Some(ref metrics) = self.metrics {
                        metrics.record_reconnect();
                    }
                } else {
                    info!(broker = %self.broker, client_id = %self.options.client_id(), "connected to broker");
                }
                self.ever_connected = true;
                self.backoff.reset();
                self.set_connected(true);

                // Clean sessions drop subscriptions, so subscribe on every CONNACK.
                client.try_subscribe(SUBSCRIBE_ALL, QoS::AtMostOnce)?;
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                if ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure))
                {
                    error!(topic = SUBSCRIBE_ALL, "broker rejected subscription");
                    return Err(SessionError::SubscribeRejected);
                }
                info!(topic = SUBSCRIBE_ALL, "subscribed");
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!(broker = %self.broker, "broker sent DISCONNECT");
            }
            other => trace!(event = ?other, "mqtt event"),
        }
        Ok(())
    }

    fn set_connected(&self, connected: bool) {
        if let Some(ref metrics) = self.metrics {
            metrics.set_connected(connected);
        }
        if !connected {
            debug!("marked disconnected");
        }
    }
}

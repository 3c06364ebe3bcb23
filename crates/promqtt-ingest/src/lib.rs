//! promqtt-ingest — feeds MQTT traffic into the retained store.
//!
//! # Architecture
//!
//! ```text
//! MqttSession::run()
//!   ├── rumqttc EventLoop::poll()
//!   │   ├── ConnAck  → subscribe '#', reset ReconnectBackoff
//!   │   ├── SubAck   → fatal if the broker refused
//!   │   └── Publish  → IngestAdapter::on_message(topic, payload)
//!   └── connection error → ReconnectBackoff delay, poll again
//! ```
//!
//! A failure before the first successful connection is returned to the
//! caller. Once connected, losses are retried indefinitely with
//! exponential backoff until the shutdown signal fires.

pub mod adapter;
pub mod backoff;
pub mod session;

pub use adapter::IngestAdapter;
pub use backoff::ReconnectBackoff;
pub use session::{MqttSession, SessionError, SUBSCRIBE_ALL};

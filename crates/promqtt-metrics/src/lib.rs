//! promqtt-metrics — turns retained MQTT payloads into Prometheus samples.
//!
//! # Architecture
//!
//! ```text
//! QueryPatterns::compile(topic, regex)   ← request parameters
//!   └── extract(snapshot, patterns) → Extraction { samples, parse_failures }
//!
//! Ephemeral exposition (one per query)
//!   ├── build_registry(samples) → fresh Registry, conflicts dropped
//!   └── encode_text(registry) → text/plain body
//!
//! BridgeMetrics
//!   └── long-lived operational counters for the /metrics endpoint
//! ```

pub mod collector;
pub mod error;
pub mod exposition;
pub mod extract;

pub use collector::BridgeMetrics;
pub use error::QueryError;
pub use exposition::{build_registry, encode_text, RegistryBuild, CONTENT_TYPE};
pub use extract::{
    capture_groups, extract, metric_name, sanitize, Extraction, QueryPatterns, Sample,
    DEFAULT_VALUE_PATTERN,
};

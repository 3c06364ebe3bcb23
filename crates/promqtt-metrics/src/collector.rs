//! Bridge metrics — process-level counters for the `/metrics` endpoint.
//!
//! Unlike query registries these live for the whole process. Counters are
//! lock-free atomics inside the `prometheus` types, so recording from the
//! MQTT event loop and from request handlers never contends.

use prometheus::{IntCounter, IntGauge, Opts, Registry};

use crate::exposition::encode_text;

/// Operational metrics for the bridge itself.
#[derive(Clone)]
pub struct BridgeMetrics {
    registry: Registry,
    messages_received: IntCounter,
    retained_topics: IntGauge,
    queries: IntCounter,
    query_errors: IntCounter,
    samples_extracted: IntCounter,
    parse_failures: IntCounter,
    registration_conflicts: IntCounter,
    mqtt_connected: IntGauge,
    mqtt_reconnects: IntCounter,
}

impl BridgeMetrics {
    /// Create the registry and register every bridge metric.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let messages_received = counter(
            &registry,
            "promqtt_messages_received_total",
            "MQTT messages received and retained.",
        )?;
        let retained_topics = gauge(
            &registry,
            "promqtt_retained_topics",
            "Distinct topics currently retained.",
        )?;
        let queries = counter(
            &registry,
            "promqtt_queries_total",
            "Extraction queries answered successfully.",
        )?;
        let query_errors = counter(
            &registry,
            "promqtt_query_errors_total",
            "Extraction queries rejected for malformed parameters.",
        )?;
        let samples_extracted = counter(
            &registry,
            "promqtt_samples_extracted_total",
            "Samples served across all queries.",
        )?;
        let parse_failures = counter(
            &registry,
            "promqtt_parse_failures_total",
            "Capture groups skipped because their text was not a number.",
        )?;
        let registration_conflicts = counter(
            &registry,
            "promqtt_registration_conflicts_total",
            "Samples dropped because another sample had the same name and labels.",
        )?;
        let mqtt_connected = gauge(
            &registry,
            "promqtt_mqtt_connected",
            "1 while connected to the MQTT broker.",
        )?;
        let mqtt_reconnects = counter(
            &registry,
            "promqtt_mqtt_reconnects_total",
            "Connections re-established after a loss.",
        )?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            messages_received,
            retained_topics,
            queries,
            query_errors,
            samples_extracted,
            parse_failures,
            registration_conflicts,
            mqtt_connected,
            mqtt_reconnects,
        })
    }

    /// Record one ingested message and the resulting store size.
    pub fn record_message(&self, retained_topics: usize) {
        self.messages_received.inc();
        self.retained_topics.set(retained_topics as i64);
    }

    /// Record a successfully answered query.
    pub fn record_query(&self, samples: usize, parse_failures: usize, conflicts: usize) {
        self.queries.inc();
        self.samples_extracted.inc_by(samples as u64);
        self.parse_failures.inc_by(parse_failures as u64);
        self.registration_conflicts.inc_by(conflicts as u64);
    }

    pub fn record_query_error(&self) {
        self.query_errors.inc();
    }

    pub fn set_connected(&self, connected: bool) {
        self.mqtt_connected.set(i64::from(connected));
    }

    pub fn record_reconnect(&self) {
        self.mqtt_reconnects.inc();
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.get()
    }

    pub fn retained_topics(&self) -> i64 {
        self.retained_topics.get()
    }

    pub fn queries(&self) -> u64 {
        self.queries.get()
    }

    pub fn query_errors(&self) -> u64 {
        self.query_errors.get()
    }

    pub fn is_connected(&self) -> bool {
        self.mqtt_connected.get() == 1
    }

    pub fn reconnects(&self) -> u64 {
        self.mqtt_reconnects.get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition of all bridge metrics.
    pub fn render(&self) -> prometheus::Result<String> {
        encode_text(&self.registry)
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntGauge> {
    let gauge = IntGauge::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

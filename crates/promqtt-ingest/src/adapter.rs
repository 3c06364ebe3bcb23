//! Ingestion adapter — one MQTT message in, one retained-store write out.

use promqtt_metrics::BridgeMetrics;
use promqtt_state::RetainedStore;

/// Writes every received message into the retained store verbatim.
///
/// Payloads are not validated here; a non-numeric payload is only
/// noticed (and skipped) when a query tries to extract from it.
#[derive(Clone)]
pub struct IngestAdapter {
    store: RetainedStore,
    metrics: Option<BridgeMetrics>,
}

impl IngestAdapter {
    pub fn new(store: RetainedStore) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: BridgeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Retain `payload` as the latest value for `topic`.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD rather than rejected.
    pub fn on_message(&self, topic: &str, payload: &[u8]) {
        let text = String::from_utf8_lossy(payload);
        self.store.put(topic, &text);

        if let Some(ref metrics) = self.metrics {
            metrics.record_message(self.store.len());
        }
    }

    pub fn store(&self) -> &RetainedStore {
        &self.store
    }
}

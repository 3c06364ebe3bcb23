//! Prometheus text exposition for query results.
//!
//! Every query gets its own `Registry`: samples are registered as gauges,
//! the registry is encoded once, then dropped. No gauge outlives the request.

use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::extract::Sample;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Label carrying the original topic on every extracted gauge.
pub const TOPIC_LABEL: &str = "topic";

const SAMPLE_HELP: &str = "Value extracted from a retained MQTT payload.";

/// A populated per-query registry.
pub struct RegistryBuild {
    pub registry: Registry,
    pub registered: usize,
    /// Samples dropped because their name and labels were already taken.
    pub conflicts: usize,
}

/// Register one gauge per sample in a fresh registry.
///
/// A sample whose name and label set collide with an earlier one is dropped
/// with a warning; the first registration wins.
pub fn build_registry(samples: &[Sample]) -> RegistryBuild {
    let registry = Registry::new();
    let mut registered = 0;
    let mut conflicts = 0;

    for sample in samples {
        let opts = Opts::new(sample.name.as_str(), SAMPLE_HELP)
            .const_label(TOPIC_LABEL, sample.topic.as_str());

        let gauge = match Gauge::with_opts(opts) {
            Ok(gauge) => gauge,
            Err(e) => {
                warn!(
                    metric = %sample.name,
                    topic = %sample.topic,
                    error = %e,
                    "invalid gauge, dropping sample"
                );
                conflicts += 1;
                continue;
            }
        };
        gauge.set(sample.value);

        match registry.register(Box::new(gauge)) {
            Ok(()) => registered += 1,
            Err(e) => {
                warn!(
                    metric = %sample.name,
                    topic = %sample.topic,
                    error = %e,
                    "metric registration conflict, dropping sample"
                );
                conflicts += 1;
            }
        }
    }

    RegistryBuild {
        registry,
        registered,
        conflicts,
    }
}

/// Encode everything in `registry` into the text exposition format.
pub fn encode_text(registry: &Registry) -> prometheus::Result<String> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, topic: &str, value: f64) -> Sample {
        Sample {
            name: name.to_string(),
            topic: topic.to_string(),
            value,
        }
    }

    #[test]
    fn render_empty() {
        let build = build_registry(&[]);
        assert_eq!(build.registered, 0);
        assert_eq!(encode_text(&build.registry).unwrap(), "");
    }

    #[test]
    fn render_single_sample() {
        let build = build_registry(&[sample("sensors_kitchen_temp1", "sensors/kitchen/temp", 21.5)]);
        assert_eq!(build.registered, 1);

        let output = encode_text(&build.registry).unwrap();
        assert!(output.contains("# TYPE sensors_kitchen_temp1 gauge"));
        assert!(output.contains("sensors_kitchen_temp1{topic=\"sensors/kitchen/temp\"} 21.5"));
    }

    #[test]
    fn same_name_different_topics_share_a_family() {
        let build = build_registry(&[
            sample("reading", "a/x", 1.0),
            sample("reading", "b/x", 2.0),
        ]);
        assert_eq!(build.registered, 2);
        assert_eq!(build.conflicts, 0);

        let output = encode_text(&build.registry).unwrap();
        assert_eq!(output.matches("# TYPE reading gauge").count(), 1);
        assert!(output.contains("reading{topic=\"a/x\"} 1"));
        assert!(output.contains("reading{topic=\"b/x\"} 2"));
    }

    #[test]
    fn duplicate_identity_keeps_first() {
        let build = build_registry(&[
            sample("dup_metric", "dup/metric", 1.0),
            sample("dup_metric", "dup/metric", 2.0),
        ]);
        assert_eq!(build.registered, 1);
        assert_eq!(build.conflicts, 1);

        let output = encode_text(&build.registry).unwrap();
        let lines: Vec<&str> = output.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("dup_metric{topic=\"dup/metric\"} 1"));
    }

    #[test]
    fn invalid_name_is_dropped_not_fatal() {
        let build = build_registry(&[
            sample("", "empty", 1.0),
            sample("ok", "fine", 3.0),
        ]);
        assert_eq!(build.registered, 1);
        assert_eq!(build.conflicts, 1);
    }

    #[test]
    fn registries_are_independent() {
        let first = build_registry(&[sample("m", "t", 1.0)]);
        let second = build_registry(&[sample("m", "t", 2.0)]);
        assert_eq!(second.conflicts, 0);
        assert!(encode_text(&first.registry).unwrap().contains("m{topic=\"t\"} 1"));
        assert!(encode_text(&second.registry).unwrap().contains("m{topic=\"t\"} 2"));
    }
}

//! Sample extraction — topic filter + value pattern over a retained snapshot.
//!
//! For every retained topic matching the topic filter, the value pattern is
//! applied to the payload and each capture group (index 0 excluded) becomes
//! one sample named `sanitize(topic + group_name)` with a `topic` label.
//! Unnamed groups are named by their index. Groups that do not participate
//! or do not parse as `f64` are skipped with a debug diagnostic.

use promqtt_state::Snapshot;
use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::error::QueryError;

/// Value pattern used when a query does not supply one: the whole payload.
pub const DEFAULT_VALUE_PATTERN: &str = "(.*)";

/// One extracted value, valid for a single query response.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Metric identifier.
    pub name: String,
    /// Original, unsanitized topic (the `topic` label value).
    pub topic: String,
    pub value: f64,
}

/// Result of running one query over a snapshot.
#[derive(Debug, Default)]
pub struct Extraction {
    pub samples: Vec<Sample>,
    /// Capture groups skipped because their text was absent or not numeric.
    pub parse_failures: usize,
}

/// Compiled topic filter and value pattern for one query.
#[derive(Debug, Clone)]
pub struct QueryPatterns {
    pub topic: Regex,
    pub value: Regex,
}

impl QueryPatterns {
    /// Compile request parameters. An absent or empty `regex` means
    /// [`DEFAULT_VALUE_PATTERN`]; an absent or empty `topic` is an error.
    pub fn compile(topic: Option<&str>, regex: Option<&str>) -> Result<Self, QueryError> {
        let topic = match topic {
            Some(t) if !t.is_empty() => t,
            _ => return Err(QueryError::MissingTopic),
        };
        let topic = Regex::new(topic).map_err(QueryError::InvalidTopic)?;

        let regex = match regex {
            Some(r) if !r.is_empty() => r,
            _ => DEFAULT_VALUE_PATTERN,
        };
        let value = Regex::new(regex).map_err(QueryError::InvalidRegex)?;

        Ok(Self { topic, value })
    }

    pub fn extract(&self, snapshot: &Snapshot) -> Extraction {
        extract(snapshot, &self.topic, &self.value)
    }
}

/// Run the topic filter and value pattern over every retained entry.
///
/// The topic filter is unanchored: it selects any topic it matches anywhere.
pub fn extract(snapshot: &Snapshot, topic_filter: &Regex, value_pattern: &Regex) -> Extraction {
    let mut extraction = Extraction::default();

    for entry in snapshot {
        if !topic_filter.is_match(&entry.topic) {
            continue;
        }

        let Some(captures) = value_pattern.captures(&entry.payload) else {
            trace!(topic = %entry.topic, "value pattern did not match payload");
            continue;
        };

        for (group, text) in capture_groups(value_pattern, &captures) {
            let Some(text) = text else {
                debug!(topic = %entry.topic, %group, "capture group did not participate, skipping");
                extraction.parse_failures += 1;
                continue;
            };

            match text.parse::<f64>() {
                Ok(value) => extraction.samples.push(Sample {
                    name: metric_name(&entry.topic, &group),
                    topic: entry.topic.to_string(),
                    value,
                }),
                Err(e) => {
                    debug!(
                        topic = %entry.topic,
                        %group,
                        captured = %text,
                        error = %e,
                        "failed to parse capture as f64, skipping"
                    );
                    extraction.parse_failures += 1;
                }
            }
        }
    }

    extraction
}

/// `(group_name, captured_text)` for every capture group after index 0.
///
/// Named groups use their name; unnamed groups use their index. Groups that
/// did not take part in the match yield `None`.
pub fn capture_groups<'h>(
    pattern: &Regex,
    captures: &Captures<'h>,
) -> Vec<(String, Option<&'h str>)> {
    pattern
        .capture_names()
        .enumerate()
        .skip(1)
        .map(|(index, name)| {
            let name = match name {
                Some(name) => name.to_string(),
                None => index.to_string(),
            };
            (name, captures.get(index).map(|m| m.as_str()))
        })
        .collect()
}

/// Metric identifier for a topic and capture group name.
pub fn metric_name(topic: &str, group: &str) -> String {
    let mut joined = String::with_capacity(topic.len() + group.len());
    joined.push_str(topic);
    joined.push_str(group);
    sanitize(&joined)
}

/// Map a string onto the Prometheus metric-name alphabet `[a-zA-Z_:][a-zA-Z0-9_:]*`.
///
/// Every other character becomes `_`, and a leading digit gets a `_` prefix.
pub fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 1);
    for (i, c) in s.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            out.push('_');
        }
        if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

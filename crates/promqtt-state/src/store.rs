//! RetainedStore — topic → last payload map behind a shared/exclusive lock.
//!
//! Writers replace a topic's value in a single critical section, so a reader
//! sees either the old payload or the new one. `snapshot()` holds the read
//! lock only while cloning `Arc` handles out of the map.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

/// One retained topic and its most recent payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedEntry {
    pub topic: Arc<str>,
    pub payload: Arc<str>,
}

/// Thread-safe latest-value store keyed by topic.
#[derive(Clone, Default)]
pub struct RetainedStore {
    entries: Arc<RwLock<HashMap<Arc<str>, Arc<str>>>>,
}

impl RetainedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the retained payload for `topic`.
    pub fn put(&self, topic: &str, payload: &str) {
        // Allocate before taking the lock.
        let payload: Arc<str> = Arc::from(payload);
        let mut entries = self.entries.write();
        match entries.get_mut(topic) {
            Some(slot) => *slot = payload,
            None => {
                entries.insert(Arc::from(topic), payload);
            }
        }
        trace!(%topic, "retained payload updated");
    }

    /// Point-in-time copy of every retained entry, ordered by topic.
    pub fn snapshot(&self) -> Snapshot {
        let mut entries: Vec<RetainedEntry> = {
            let guard = self.entries.read();
            guard
                .iter()
                .map(|(topic, payload)| RetainedEntry {
                    topic: Arc::clone(topic),
                    payload: Arc::clone(payload),
                })
                .collect()
        };
        entries.sort_unstable_by(|a, b| a.topic.cmp(&b.topic));
        Snapshot { entries }
    }

    pub fn get(&self, topic: &str) -> Option<Arc<str>> {
        self.entries.read().get(topic).cloned()
    }

    /// Number of distinct topics retained.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Read-only view of the store, detached from the lock.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<RetainedEntry>,
}

impl Snapshot {
    pub fn iter(&self) -> std::slice::Iter<'_, RetainedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a RetainedEntry;
    type IntoIter = std::slice::Iter<'a, RetainedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Build a snapshot directly from pairs. Later pairs win for repeated topics.
impl<T, P> FromIterator<(T, P)> for Snapshot
where
    T: AsRef<str>,
    P: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (T, P)>>(iter: I) -> Self {
        let store = RetainedStore::new();
        for (topic, payload) in iter {
            store.put(topic.as_ref(), payload.as_ref());
        }
        store.snapshot()
    }
}

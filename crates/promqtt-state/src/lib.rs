//! promqtt-state — in-memory retained store for promqtt.
//!
//! Holds the most recent payload seen for every topic. Ingestion writes
//! through [`RetainedStore::put`]; queries read a point-in-time
//! [`Snapshot`] and do their regex work after the lock is released.
//!
//! The `RetainedStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<RwLock<..>>`) and can be shared across async tasks and the MQTT
//! client's callback context.
//!
//! Nothing is persisted; the store lives as long as the process.

pub mod store;

pub use store::{RetainedEntry, RetainedStore, Snapshot};

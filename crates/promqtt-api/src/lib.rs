//! promqtt-api — HTTP surface of the bridge.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/mqtt?topic=<re>&regex=<re>` | Extract samples from retained payloads |
//! | GET | `/metrics` | Bridge process metrics |
//!
//! Both respond in the Prometheus text exposition format. `/mqtt` builds a
//! fresh registry per request; `/metrics` reads the long-lived
//! [`BridgeMetrics`] registry.

pub mod handlers;

use axum::Router;
use axum::routing::get;
use promqtt_metrics::BridgeMetrics;
use promqtt_state::RetainedStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: RetainedStore,
    pub metrics: BridgeMetrics,
}

/// Build the complete API router.
pub fn build_router(store: RetainedStore, metrics: BridgeMetrics) -> Router {
    let state = ApiState { store, metrics };

    Router::new()
        .route("/mqtt", get(handlers::query_mqtt))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}

//! HTTP handlers.
//!
//! Errors are returned as `text/plain` bodies; successful responses carry
//! the Prometheus text exposition format.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, error};

use promqtt_metrics::{build_registry, encode_text, QueryPatterns};

use crate::ApiState;

/// Query parameters for `GET /mqtt`.
#[derive(Debug, Default, Deserialize)]
pub struct MqttQuery {
    /// Topic filter regex (required).
    pub topic: Option<String>,
    /// Value pattern regex; defaults to `(.*)`.
    pub regex: Option<String>,
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("{msg}\n"),
    )
}

fn exposition_response(body: String) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, promqtt_metrics::CONTENT_TYPE)],
        body,
    )
}

// ── Extraction ─────────────────────────────────────────────────

/// GET /mqtt
pub async fn query_mqtt(
    State(state): State<ApiState>,
    Query(params): Query<MqttQuery>,
) -> Response {
    let patterns = match QueryPatterns::compile(params.topic.as_deref(), params.regex.as_deref()) {
        Ok(patterns) => patterns,
        Err(e) => {
            state.metrics.record_query_error();
            debug!(parameter = e.parameter(), error = %e, "rejected query");
            return error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response();
        }
    };

    // The store lock is released before any regex work starts.
    let snapshot = state.store.snapshot();
    let extraction = patterns.extract(&snapshot);
    let build = build_registry(&extraction.samples);

    match encode_text(&build.registry) {
        Ok(body) => {
            state
                .metrics
                .record_query(build.registered, extraction.parse_failures, build.conflicts);
            debug!(
                topic = %patterns.topic,
                samples = build.registered,
                skipped = extraction.parse_failures,
                conflicts = build.conflicts,
                "query answered"
            );
            exposition_response(body).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to encode query registry");
            error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
        }
    }
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> Response {
    match state.metrics.render() {
        Ok(body) => exposition_response(body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode bridge metrics");
            error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
        }
    }
}

//! Bridge mode — MQTT ingestion plus the HTTP API in one process.
//!
//! The daemon:
//! 1. Creates the retained store and bridge metrics
//! 2. Starts the MQTT session (subscribes to `#`)
//! 3. Serves `/mqtt` and `/metrics` over HTTP
//! 4. Stops both on SIGINT/SIGTERM, or when either fails

use anyhow::Context;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use promqtt_api::build_router;
use promqtt_core::BridgeConfig;
use promqtt_ingest::{IngestAdapter, MqttSession};
use promqtt_metrics::BridgeMetrics;
use promqtt_state::RetainedStore;

/// Run the bridge until a shutdown signal or a fatal error.
pub async fn run_bridge(config: BridgeConfig) -> anyhow::Result<()> {
    info!(?config, "promqtt bridge starting");

    // ── Initialize subsystems ──────────────────────────────────

    let store = RetainedStore::new();
    let metrics = BridgeMetrics::new().context("failed to register bridge metrics")?;

    let adapter = IngestAdapter::new(store.clone()).with_metrics(metrics.clone());
    let session = MqttSession::new(&config, adapter)?.with_metrics(metrics.clone());

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to listen on {addr}"))?;

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_shutdown = shutdown_rx.clone();

    // ── Start tasks ────────────────────────────────────────────

    let mut mqtt_handle = tokio::spawn(session.run(shutdown_rx));

    let router = build_router(store, metrics);
    info!(%addr, "HTTP server listening");
    let mut server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
    });

    let mut mqtt_result = None;
    let mut server_result = None;

    tokio::select! {
        _ = shutdown_signal() => info!("shutdown signal received"),
        res = &mut mqtt_handle => mqtt_result = Some(joined(res, "mqtt session")),
        res = &mut server_handle => server_result = Some(joined(res, "HTTP server")),
    }

    let _ = shutdown_tx.send(true);

    let mqtt_result = match mqtt_result {
        Some(res) => res,
        None => joined(mqtt_handle.await, "mqtt session"),
    };
    let server_result = match server_result {
        Some(res) => res,
        None => joined(server_handle.await, "HTTP server"),
    };

    if let Err(ref e) = mqtt_result {
        error!(error = %format!("{e:#}"), "mqtt session stopped");
    }
    if let Err(ref e) = server_result {
        error!(error = %format!("{e:#}"), "HTTP server stopped");
    }

    mqtt_result?;
    server_result?;

    info!("promqtt bridge stopped");
    Ok(())
}

/// Flatten a task's join result and its own result.
fn joined<E>(res: Result<Result<(), E>, JoinError>, task: &str) -> anyhow::Result<()>
where
    E: std::error::Error + Send + Sync + 'static,
{
    res.with_context(|| format!("{task} task panicked"))?
        .with_context(|| format!("{task} failed"))
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

// Copyright (c) 2025 Snapvault Contributors. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "snapvault=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if PROM_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
    }

    metrics::describe_counter!(
        "snapvault_snapshots_saved_total",
        "Total number of snapshot records written"
    );
    metrics::describe_counter!(
        "snapvault_snapshots_deleted_total",
        "Total number of snapshot files removed"
    );
    metrics::describe_counter!(
        "snapvault_snapshots_pruned_total",
        "Total number of snapshot files removed by pruning"
    );
    metrics::describe_counter!(
        "snapvault_scan_skipped_total",
        "Corrupt or unreadable record files skipped during directory scans"
    );

    // Ensure at least one metric exists on startup
    metrics::gauge!("snapvault_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}

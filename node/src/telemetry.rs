// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pulse_node=debug".into()),
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
        "pulse_requests_total",
        "Client-facing requests served, by endpoint"
    );
    metrics::describe_counter!("pulse_heartbeat_cycles_total", "Heartbeat cycles completed");
    metrics::describe_counter!(
        "pulse_fd_transitions_total",
        "Failure-detector state transitions"
    );
    metrics::describe_counter!(
        "pulse_replicate_results_total",
        "Replication apply calls completed, by outcome"
    );
    metrics::describe_counter!(
        "pulse_replicate_dropped_total",
        "Replication jobs dropped on a full peer queue"
    );

    metrics::gauge!("pulse_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use pulse_node::config::{parse_peer_list, NodeConfig, NodeRole};
use pulse_node::heartbeat;
use pulse_node::server::{build_router, AppState};
use pulse_node::telemetry;

#[derive(Parser)]
#[command(name = "pulse-node")]
#[command(
    about = "Single-leader in-memory KV node with heartbeat failure detection",
    long_about = None
)]
struct Args {
    /// Node identity, used in the event log and in peer lists.
    #[arg(long)]
    id: String,

    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Run as the leader.
    #[arg(long)]
    leader: bool,

    /// Followers to replicate to, as `id@host:port`, comma-separated
    /// (leader only).
    #[arg(long)]
    peers: Option<String>,

    /// Leader address as `host:port` (follower only).
    #[arg(long)]
    leader_addr: Option<String>,

    /// Heartbeat probe cadence.
    #[arg(long, default_value_t = 100)]
    hb_interval_ms: u64,

    /// Silence after the last successful contact before a peer is Dead.
    #[arg(long, default_value_t = 500)]
    hb_timeout_ms: u64,

    /// Per-probe connect/response bound.
    #[arg(long, default_value_t = 200)]
    probe_timeout_ms: u64,

    /// Per-replication-call bound.
    #[arg(long, default_value_t = 500)]
    replicate_timeout_ms: u64,

    /// Event log path (JSONL, append-only).
    #[arg(long, default_value = "node.jsonl")]
    log: PathBuf,
}

impl Args {
    fn into_config(self) -> anyhow::Result<NodeConfig> {
        let role = if self.leader {
            let peers = match self.peers.as_deref() {
                Some(list) => parse_peer_list(list)?,
                None => Vec::new(),
            };
            NodeRole::Leader { peers }
        } else {
            let leader_addr = self
                .leader_addr
                .ok_or_else(|| anyhow::anyhow!("--leader-addr is required for a follower"))?;
            NodeRole::Follower {
                leader_url: format!("http://{leader_addr}"),
            }
        };

        Ok(NodeConfig {
            node_id: self.id,
            bind_addr: self.listen,
            role,
            heartbeat_interval_ms: self.hb_interval_ms,
            heartbeat_timeout_ms: self.hb_timeout_ms,
            probe_timeout_ms: self.probe_timeout_ms,
            replicate_timeout_ms: self.replicate_timeout_ms,
            log_path: self.log,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init_telemetry();

    let config = args.into_config()?;
    tracing::info!(
        node_id = %config.node_id,
        leader = config.role.is_leader(),
        "initializing node"
    );

    let state = AppState::new(config)?;

    state.logger.log(
        "node_start",
        None,
        None,
        json!({
            "host": state.config.bind_addr.ip().to_string(),
            "port": state.config.bind_addr.port(),
            "is_leader": state.is_leader(),
            "hb_interval_ms": state.config.heartbeat_interval_ms,
            "hb_timeout_ms": state.config.heartbeat_timeout_ms,
        }),
    );

    tokio::spawn(heartbeat::run_heartbeat_loop(state.clone()));

    let app = build_router(state.clone());

    // Failure to bind is the only process-fatal error after startup.
    let listener = TcpListener::bind(state.config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.logger.log("node_stop", None, None, json!({}));
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("shutdown signal error: {e}");
    }
}

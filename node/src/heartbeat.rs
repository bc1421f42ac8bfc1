// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! Fixed-cadence liveness probing.
//!
//! One long-lived loop per node: a leader probes each follower's ping
//! endpoint in turn, a follower probes the leader's under the fixed key
//! `"leader"`. Each probe is bounded by the probe timeout and its
//! outcome feeds the peer-health tracker immediately. The loop sleeps
//! `max(1, interval − elapsed)` between cycles, keeping the nominal
//! cadence regardless of probe latency without busy-looping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pulse_kernel::types::PeerId;

use crate::config::NodeRole;
use crate::errors::NodeError;
use crate::network::PeerClient;
use crate::server::AppState;

fn probe_targets(state: &AppState) -> Result<Vec<(String, PeerClient)>, NodeError> {
    let cfg = &state.config;
    let mut targets = Vec::new();
    match &cfg.role {
        NodeRole::Leader { peers } => {
            for peer in peers {
                let client = PeerClient::new(
                    peer.base_url(),
                    cfg.probe_timeout_ms,
                    cfg.replicate_timeout_ms,
                )?;
                targets.push((peer.id.clone(), client));
            }
        }
        NodeRole::Follower { leader_url } => {
            let client = PeerClient::new(
                leader_url.clone(),
                cfg.probe_timeout_ms,
                cfg.replicate_timeout_ms,
            )?;
            targets.push((PeerId::LEADER.to_string(), client));
        }
    }
    Ok(targets)
}

/// Run until the process exits. A failed probe is data for the failure
/// detector, never a reason to stop.
pub async fn run_heartbeat_loop(state: Arc<AppState>) {
    let targets = match probe_targets(&state) {
        Ok(targets) => targets,
        Err(e) => {
            tracing::error!("heartbeat: cannot build peer clients: {e}");
            return;
        }
    };
    let interval_ms = state.config.heartbeat_interval_ms;

    loop {
        let t0 = Instant::now();
        for (peer_id, client) in &targets {
            let ok = client.ping(&state.config.node_id).await.is_ok();
            state.health.observe(peer_id, ok);
        }
        metrics::increment_counter!("pulse_heartbeat_cycles_total");

        let elapsed = t0.elapsed().as_millis() as u64;
        let sleep_ms = interval_ms.saturating_sub(elapsed).max(1);
        tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
    }
}

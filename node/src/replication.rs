// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! Best-effort write fan-out (leader only).
//!
//! One worker task and one bounded queue per follower. `replicate`
//! enqueues an accepted write on every queue and returns immediately:
//! the client's response never waits on any peer outcome. Workers POST
//! `/internal/replicate` with a bounded per-call timeout, feed each
//! outcome into the peer-health tracker, and log one `replicate_result`
//! per peer call. No retry, no backoff, no quorum, no catch-up: an
//! unreachable peer drifts until the experiment restarts it.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::api::ReplicateRequest;
use crate::config::{NodeConfig, Peer};
use crate::errors::NodeError;
use crate::events::EventLogger;
use crate::health::PeerHealthTracker;
use crate::network::PeerClient;

/// Per-peer backlog bound. A slow or dead peer sheds load here instead
/// of accumulating one task per write.
const QUEUE_DEPTH: usize = 64;

pub struct ReplicationCoordinator {
    peers: Vec<PeerQueue>,
    logger: Arc<EventLogger>,
}

struct PeerQueue {
    peer_id: String,
    tx: mpsc::Sender<ReplicateRequest>,
}

impl ReplicationCoordinator {
    /// Spawn one worker per configured peer. Workers run until the
    /// process exits; in-flight calls finish or time out, they are not
    /// cancelled on shutdown.
    pub fn start(
        peers: &[Peer],
        config: &NodeConfig,
        health: Arc<PeerHealthTracker>,
        logger: Arc<EventLogger>,
    ) -> Result<Self, NodeError> {
        let mut queues = Vec::with_capacity(peers.len());
        for peer in peers {
            let client = PeerClient::new(
                peer.base_url(),
                config.probe_timeout_ms,
                config.replicate_timeout_ms,
            )?;
            let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
            tokio::spawn(run_worker(
                peer.id.clone(),
                client,
                rx,
                health.clone(),
                logger.clone(),
            ));
            queues.push(PeerQueue {
                peer_id: peer.id.clone(),
                tx,
            });
        }
        Ok(ReplicationCoordinator {
            peers: queues,
            logger,
        })
    }

    /// Enqueue one accepted write for every peer, fire-and-forget.
    ///
    /// A peer whose queue is full drops the job: the drop is logged as a
    /// failed `replicate_result` but not fed to the failure detector,
    /// since a slow consumer is not evidence the peer is down.
    pub fn replicate(&self, job: ReplicateRequest) {
        for peer in &self.peers {
            match peer.tx.try_send(job.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(job)) => {
                    metrics::increment_counter!("pulse_replicate_dropped_total");
                    tracing::warn!(peer_id = %peer.peer_id, rid = %job.rid, "replication backlog full, dropping");
                    self.logger.log(
                        "replicate_result",
                        Some(&job.rid),
                        Some(&job.key),
                        json!({ "peer_id": peer.peer_id, "ok": false, "error": "backlog_full" }),
                    );
                }
                Err(TrySendError::Closed(job)) => {
                    tracing::error!(peer_id = %peer.peer_id, rid = %job.rid, "replication worker gone");
                }
            }
        }
    }
}

async fn run_worker(
    peer_id: String,
    client: PeerClient,
    mut rx: mpsc::Receiver<ReplicateRequest>,
    health: Arc<PeerHealthTracker>,
    logger: Arc<EventLogger>,
) {
    while let Some(job) = rx.recv().await {
        let (ok, status) = match client.replicate(&job).await {
            Ok(status) => (status == 200, status),
            Err(_) => (false, 0),
        };

        health.observe(&peer_id, ok);
        metrics::increment_counter!(
            "pulse_replicate_results_total",
            "ok" => if ok { "true" } else { "false" }
        );
        logger.log(
            "replicate_result",
            Some(&job.rid),
            Some(&job.key),
            json!({ "peer_id": peer_id, "ok": ok, "http_status": status }),
        );
    }
}

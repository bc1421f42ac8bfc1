// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! Peer-health tracking.
//!
//! Owns the kernel failure detector under its own exclusive-access
//! section, stamps observations with monotonic time, and turns each
//! state transition into exactly one `fd_state_change` event. The same
//! tracker serves both roles: a leader tracks every follower, a follower
//! tracks the single leader under the fixed key `"leader"`. On a leader
//! the states are observability only; they never gate writes.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use pulse_kernel::detector::{FailureDetector, PeerState};
use serde::Serialize;
use serde_json::json;

use crate::events::EventLogger;

pub struct PeerHealthTracker {
    detector: Mutex<FailureDetector>,
    origin: Instant,
    logger: Arc<EventLogger>,
}

/// One row of the health snapshot exposed at `/internal/health`.
#[derive(Clone, Debug, Serialize)]
pub struct PeerHealthInfo {
    pub peer_id: String,
    pub state: PeerState,
    pub last_ok_ms: Option<u64>,
}

impl PeerHealthTracker {
    pub fn new(timeout_ms: u64, logger: Arc<EventLogger>) -> Self {
        PeerHealthTracker {
            detector: Mutex::new(FailureDetector::new(timeout_ms)),
            origin: Instant::now(),
            logger,
        }
    }

    /// Monotonic milliseconds since tracker construction.
    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// Record one probe or replication outcome.
    pub fn observe(&self, peer_id: &str, success: bool) {
        let now = self.now_ms();
        let transition = {
            let mut detector = self.detector.lock().unwrap_or_else(|p| p.into_inner());
            detector.observe(peer_id, success, now)
        };
        if let Some(t) = transition {
            metrics::increment_counter!("pulse_fd_transitions_total");
            tracing::info!(
                peer_id,
                from = t.from.as_str(),
                to = t.to.as_str(),
                "peer state change"
            );
            self.logger.log(
                "fd_state_change",
                None,
                None,
                json!({ "peer_id": peer_id, "from": t.from.as_str(), "to": t.to.as_str() }),
            );
        }
    }

    pub fn state(&self, peer_id: &str) -> Option<PeerState> {
        self.detector
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .state(peer_id)
    }

    /// Read-only snapshot, sorted by peer id for stable output.
    pub fn snapshot(&self) -> Vec<PeerHealthInfo> {
        let detector = self.detector.lock().unwrap_or_else(|p| p.into_inner());
        let mut peers: Vec<PeerHealthInfo> = detector
            .records()
            .map(|(id, record)| PeerHealthInfo {
                peer_id: id.to_string(),
                state: record.state,
                last_ok_ms: record.last_success_ms,
            })
            .collect();
        peers.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
        peers
    }
}

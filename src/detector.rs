// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! Tri-state failure detector.
//!
//! One [`PeerHealth`] record per known peer, created lazily on the first
//! observation and never removed. A record's state depends only on
//! `now − last_success` and the configured timeout:
//!
//! - `Alive`: the last observation succeeded
//! - `Suspected`: failing, but within the timeout (or never succeeded)
//! - `Dead`: failing for longer than the timeout
//!
//! # Invariants
//! - A peer is never declared `Dead` before at least one success has been
//!   recorded for it (start-up grace).
//! - [`FailureDetector::observe`] returns a [`Transition`] iff the stored
//!   state changed, so each actual transition is observed exactly once.
//! - `Dead` is sticky: later successes still update `last_success_ms` but
//!   no longer transition the record. Recovery is out of scope.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::types::PeerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerState {
    Alive,
    Suspected,
    Dead,
}

impl PeerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerState::Alive => "Alive",
            PeerState::Suspected => "Suspected",
            PeerState::Dead => "Dead",
        }
    }
}

/// Health record for one peer.
#[derive(Clone, Debug)]
pub struct PeerHealth {
    /// Monotonic time of the last successful contact, if any.
    pub last_success_ms: Option<u64>,
    pub state: PeerState,
}

/// A state change produced by [`FailureDetector::observe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: PeerState,
    pub to: PeerState,
}

#[derive(Debug)]
pub struct FailureDetector {
    timeout_ms: u64,
    peers: FxHashMap<PeerId, PeerHealth>,
}

impl FailureDetector {
    pub fn new(timeout_ms: u64) -> Self {
        FailureDetector {
            timeout_ms,
            peers: FxHashMap::default(),
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Feed one probe or replication outcome into the state machine.
    ///
    /// `now_ms` must come from a monotonic clock; wall-clock jumps would
    /// fabricate or mask timeouts.
    pub fn observe(&mut self, peer: &str, success: bool, now_ms: u64) -> Option<Transition> {
        let record = self.peers.entry(PeerId::new(peer)).or_insert(PeerHealth {
            last_success_ms: None,
            state: PeerState::Alive,
        });

        if success {
            record.last_success_ms = Some(now_ms);
        }

        if record.state == PeerState::Dead {
            return None;
        }

        let target = match (success, record.last_success_ms) {
            // Never succeeded: suspicion only, regardless of outcome.
            (_, None) => PeerState::Suspected,
            (true, Some(_)) => PeerState::Alive,
            (false, Some(last)) => {
                if now_ms.saturating_sub(last) > self.timeout_ms {
                    PeerState::Dead
                } else {
                    PeerState::Suspected
                }
            }
        };

        if target == record.state {
            return None;
        }
        let from = record.state;
        record.state = target;
        Some(Transition { from, to: target })
    }

    pub fn state(&self, peer: &str) -> Option<PeerState> {
        self.peers.get(peer).map(|r| r.state)
    }

    pub fn last_success_ms(&self, peer: &str) -> Option<u64> {
        self.peers.get(peer).and_then(|r| r.last_success_ms)
    }

    /// All known records: every follower on a leader, the single leader
    /// entry on a follower.
    pub fn records(&self) -> impl Iterator<Item = (&PeerId, &PeerHealth)> {
        self.peers.iter()
    }
}

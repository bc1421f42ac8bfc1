use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::NodeError;

/// A replication/probe target, fixed at startup.
#[derive(Clone, Debug)]
pub struct Peer {
    pub id: String,
    pub host: String,
    pub port: u16,
}

impl Peer {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug)]
pub enum NodeRole {
    Leader { peers: Vec<Peer> },
    Follower { leader_url: String },
}

impl NodeRole {
    pub fn is_leader(&self) -> bool {
        matches!(self, NodeRole::Leader { .. })
    }
}

/// Immutable for the process lifetime. The CLI layer validates and builds
/// this; nothing below it re-reads arguments or the environment.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub node_id: String,
    pub bind_addr: SocketAddr,
    pub role: NodeRole,
    pub heartbeat_interval_ms: u64,
    /// Silence after the last successful contact before a peer is Dead.
    pub heartbeat_timeout_ms: u64,
    /// Per-probe connect/response bound, independent of the cadence.
    pub probe_timeout_ms: u64,
    /// Per-replication-call bound.
    pub replicate_timeout_ms: u64,
    /// Event log path (JSONL, append-only).
    pub log_path: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "node".to_string(),
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            role: NodeRole::Leader { peers: Vec::new() },
            heartbeat_interval_ms: 100,
            heartbeat_timeout_ms: 500,
            probe_timeout_ms: 200,
            replicate_timeout_ms: 500,
            log_path: PathBuf::from("node.jsonl"),
        }
    }
}

/// Parse a comma-separated `id@host:port` peer list.
pub fn parse_peer_list(list: &str) -> Result<Vec<Peer>, NodeError> {
    let mut peers = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (id, addr) = item
            .split_once('@')
            .ok_or_else(|| NodeError::Config(format!("peer `{item}` missing `@`")))?;
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| NodeError::Config(format!("peer `{item}` missing `:port`")))?;
        if id.is_empty() || host.is_empty() {
            return Err(NodeError::Config(format!("peer `{item}` has empty id or host")));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| NodeError::Config(format!("peer `{item}` has invalid port")))?;
        peers.push(Peer {
            id: id.to_string(),
            host: host.to_string(),
            port,
        });
    }
    Ok(peers)
}

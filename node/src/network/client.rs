use std::time::Duration;

use reqwest::Client;

use crate::api::ReplicateRequest;
use crate::errors::NodeError;

/// Client for one peer's internal endpoints.
///
/// Every call is bounded by a per-call timeout, independent of the
/// heartbeat cadence, so a single unreachable peer cannot stall a
/// heartbeat cycle or another peer's replication.
#[derive(Debug, Clone)]
pub struct PeerClient {
    base_url: String,
    client: Client,
    probe_timeout: Duration,
    replicate_timeout: Duration,
}

impl PeerClient {
    pub fn new(
        base_url: impl Into<String>,
        probe_timeout_ms: u64,
        replicate_timeout_ms: u64,
    ) -> Result<Self, NodeError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(probe_timeout_ms))
            .build()
            .map_err(|e| NodeError::Network(e.to_string()))?;
        Ok(PeerClient {
            base_url,
            client,
            probe_timeout: Duration::from_millis(probe_timeout_ms),
            replicate_timeout: Duration::from_millis(replicate_timeout_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Liveness probe. Any transport error or non-success status is a
    /// failed probe.
    pub async fn ping(&self, from: &str) -> Result<(), NodeError> {
        let url = format!("{}/internal/ping?from={}", self.base_url, from);
        let resp = self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| NodeError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NodeError::Network(format!("ping failed: {}", resp.status())));
        }
        Ok(())
    }

    /// Apply call for one replicated write. Returns the HTTP status
    /// whenever the peer answered at all; transport failures are
    /// `Network` errors.
    pub async fn replicate(&self, req: &ReplicateRequest) -> Result<u16, NodeError> {
        let url = format!("{}/internal/replicate", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(req)
            .timeout(self.replicate_timeout)
            .send()
            .await
            .map_err(|e| NodeError::Network(e.to_string()))?;

        Ok(resp.status().as_u16())
    }
}

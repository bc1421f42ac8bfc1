// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

use crate::health::PeerHealthInfo;

/// Replicated operation kind, `"PUT"` or `"DEL"` on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Op {
    Put,
    Del,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Put => "PUT",
            Op::Del => "DEL",
        }
    }
}

/// Optional caller-supplied request id, e.g. `/put?rid=abc`.
#[derive(Debug, Deserialize)]
pub struct RidQuery {
    pub rid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PutRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct PutResponse {
    pub ok: bool,
    pub rid: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
    pub rid: String,
    pub removed: bool,
}

#[derive(Debug, Deserialize)]
pub struct GetRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct GetResponse {
    pub ok: bool,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub ok: bool,
}

/// Body of the internal fan-out call, applied unconditionally by the
/// receiver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplicateRequest {
    pub rid: String,
    pub op: Op,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplicateResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub node_id: String,
    pub role: &'static str,
    pub peers: Vec<PeerHealthInfo>,
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    /// Malformed or incomplete request body. Surfaced immediately, never
    /// retried.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Write attempted on a non-leader. The client retries against the
    /// leader; no forwarding happens here.
    #[error("not_leader")]
    NotLeader,

    /// Peer transport failure. Feeds the failure detector and the event
    /// log only; never surfaced to a client.
    #[error("peer unreachable: {0}")]
    Network(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            NodeError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            NodeError::NotLeader => (StatusCode::CONFLICT, "not_leader".to_string()),
            NodeError::Network(msg) => (StatusCode::BAD_GATEWAY, msg),
            NodeError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            NodeError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

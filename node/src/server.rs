// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::Mutex;

use pulse_kernel::store::KvStore;

use crate::api::{
    DeleteRequest, DeleteResponse, GetRequest, GetResponse, HealthResponse, Op, PingResponse,
    PutRequest, PutResponse, ReplicateRequest, ReplicateResponse, RidQuery,
};
use crate::config::{NodeConfig, NodeRole};
use crate::errors::NodeError;
use crate::events::EventLogger;
use crate::health::PeerHealthTracker;
use crate::replication::ReplicationCoordinator;
use crate::telemetry;

pub type SharedStore = Arc<Mutex<KvStore>>;

/// Long-lived node state, constructed once at startup and shared by every
/// request task, the heartbeat loop, and the replication workers.
///
/// Each member owns its own exclusive-access section (store mutex,
/// detector mutex, log writer mutex); no section is ever entered while
/// holding another, so there is no cross-resource lock ordering to get
/// wrong.
pub struct AppState {
    pub config: NodeConfig,
    pub store: SharedStore,
    pub logger: Arc<EventLogger>,
    pub health: Arc<PeerHealthTracker>,
    pub replicator: Option<ReplicationCoordinator>,
}

impl AppState {
    /// Wire the components for one node. A leader config also starts the
    /// replication workers, so this must run inside the runtime.
    pub fn new(config: NodeConfig) -> Result<Arc<Self>, NodeError> {
        let logger = Arc::new(EventLogger::open(&config.node_id, &config.log_path)?);
        let health = Arc::new(PeerHealthTracker::new(
            config.heartbeat_timeout_ms,
            logger.clone(),
        ));
        let replicator = match &config.role {
            NodeRole::Leader { peers } => Some(ReplicationCoordinator::start(
                peers,
                &config,
                health.clone(),
                logger.clone(),
            )?),
            NodeRole::Follower { .. } => None,
        };

        Ok(Arc::new(AppState {
            store: Arc::new(Mutex::new(KvStore::new())),
            logger,
            health,
            replicator,
            config,
        }))
    }

    pub fn is_leader(&self) -> bool {
        self.config.role.is_leader()
    }

    /// Request id: caller-supplied, else generated. The generated form is
    /// unique per process (wall time + sequence).
    fn rid_or_generate(&self, rid: Option<String>, seq: u64) -> String {
        rid.unwrap_or_else(|| format!("{}-{}", chrono::Utc::now().timestamp_millis(), seq))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/put", post(put_key))
        .route("/del", post(del_key))
        .route("/get", post(get_key))
        .route("/internal/ping", get(ping))
        .route("/internal/replicate", post(replicate_apply))
        .route("/internal/health", get(health_snapshot))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn put_key(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RidQuery>,
    payload: Result<Json<PutRequest>, JsonRejection>,
) -> Result<Json<PutResponse>, NodeError> {
    let seq = state.logger.next_seq();
    let rid = state.rid_or_generate(q.rid, seq);
    metrics::increment_counter!("pulse_requests_total", "endpoint" => "put");

    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            state.logger.log("put_badreq", Some(&rid), None, json!({}));
            return Err(NodeError::BadRequest(rejection.body_text()));
        }
    };

    if !state.is_leader() {
        state
            .logger
            .log("put_reject_not_leader", Some(&rid), Some(&req.key), json!({}));
        return Err(NodeError::NotLeader);
    }

    state.store.lock().await.put(req.key.clone(), req.value.clone());
    state.logger.log(
        "put_ok",
        Some(&rid),
        Some(&req.key),
        json!({ "value_len": req.value.len() }),
    );

    if let Some(replicator) = &state.replicator {
        replicator.replicate(ReplicateRequest {
            rid: rid.clone(),
            op: Op::Put,
            key: req.key,
            value: Some(req.value),
        });
    }

    Ok(Json(PutResponse { ok: true, rid }))
}

async fn del_key(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RidQuery>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>, NodeError> {
    let seq = state.logger.next_seq();
    let rid = state.rid_or_generate(q.rid, seq);
    metrics::increment_counter!("pulse_requests_total", "endpoint" => "del");

    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            state.logger.log("del_badreq", Some(&rid), None, json!({}));
            return Err(NodeError::BadRequest(rejection.body_text()));
        }
    };

    if !state.is_leader() {
        state
            .logger
            .log("del_reject_not_leader", Some(&rid), Some(&req.key), json!({}));
        return Err(NodeError::NotLeader);
    }

    let removed = state.store.lock().await.delete(&req.key);
    state.logger.log(
        "del_ok",
        Some(&rid),
        Some(&req.key),
        json!({ "removed": removed }),
    );

    if let Some(replicator) = &state.replicator {
        replicator.replicate(ReplicateRequest {
            rid: rid.clone(),
            op: Op::Del,
            key: req.key,
            value: None,
        });
    }

    Ok(Json(DeleteResponse {
        ok: true,
        rid,
        removed,
    }))
}

async fn get_key(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RidQuery>,
    payload: Result<Json<GetRequest>, JsonRejection>,
) -> Result<Json<GetResponse>, NodeError> {
    let seq = state.logger.next_seq();
    let rid = state.rid_or_generate(q.rid, seq);
    metrics::increment_counter!("pulse_requests_total", "endpoint" => "get");

    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            state.logger.log("get_badreq", Some(&rid), None, json!({}));
            return Err(NodeError::BadRequest(rejection.body_text()));
        }
    };

    // Always served locally, regardless of role: an unreplicated key is
    // a miss here even right after a leader accepted it.
    let value = state.store.lock().await.get(&req.key).map(str::to_string);

    match value {
        Some(value) => {
            state.logger.log(
                "get_ok",
                Some(&rid),
                Some(&req.key),
                json!({ "value_len": value.len() }),
            );
            Ok(Json(GetResponse {
                ok: true,
                found: true,
                value: Some(value),
            }))
        }
        None => {
            state
                .logger
                .log("get_notfound", Some(&rid), Some(&req.key), json!({}));
            Ok(Json(GetResponse {
                ok: true,
                found: false,
                value: None,
            }))
        }
    }
}

/// Probe target for the heartbeat loop. Succeeds whenever the process is
/// alive and accepting connections.
async fn ping() -> Json<PingResponse> {
    Json(PingResponse { ok: true })
}

/// Internal fan-out target. Applies the operation unconditionally and
/// idempotently regardless of role; not client-facing, so the sequence
/// counter does not advance.
async fn replicate_apply(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReplicateRequest>, JsonRejection>,
) -> Result<Json<ReplicateResponse>, NodeError> {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            state.logger.log("replicate_badreq", None, None, json!({}));
            return Err(NodeError::BadRequest(rejection.body_text()));
        }
    };

    {
        let mut store = state.store.lock().await;
        match req.op {
            Op::Put => store.put(req.key.clone(), req.value.clone().unwrap_or_default()),
            Op::Del => {
                store.delete(&req.key);
            }
        }
    }

    state.logger.log(
        "replicate_apply",
        Some(&req.rid),
        Some(&req.key),
        json!({ "op": req.op.as_str() }),
    );

    Ok(Json(ReplicateResponse { ok: true }))
}

async fn health_snapshot(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        node_id: state.config.node_id.clone(),
        role: if state.is_leader() { "leader" } else { "follower" },
        peers: state.health.snapshot(),
    })
}

async fn metrics_handler() -> String {
    telemetry::get_metrics()
}

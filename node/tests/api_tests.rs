use std::path::Path;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::ServiceExt;

use pulse_node::config::{NodeConfig, NodeRole};
use pulse_node::server::{build_router, AppState};

fn leader_config(dir: &Path) -> NodeConfig {
    NodeConfig {
        node_id: "A".to_string(),
        role: NodeRole::Leader { peers: Vec::new() },
        log_path: dir.join("A.jsonl"),
        ..Default::default()
    }
}

fn follower_config(dir: &Path) -> NodeConfig {
    NodeConfig {
        node_id: "B".to_string(),
        role: NodeRole::Follower {
            leader_url: "http://127.0.0.1:9".to_string(),
        },
        log_path: dir.join("B.jsonl"),
        ..Default::default()
    }
}

async fn post_json(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get_path(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn count_events(log_path: &Path, event_type: &str) -> usize {
    let log = std::fs::read_to_string(log_path).unwrap_or_default();
    log.lines()
        .filter(|line| line.contains(&format!("\"type\":\"{event_type}\"")))
        .count()
}

#[tokio::test]
async fn test_put_then_get_on_leader() {
    let dir = tempdir().unwrap();
    let state = AppState::new(leader_config(dir.path())).unwrap();
    let app = build_router(state);

    let (status, body) = post_json(&app, "/put?rid=w1", json!({"key": "x", "value": "42"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["rid"], json!("w1"));

    let (status, body) = post_json(&app, "/get", json!({"key": "x"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["found"], json!(true));
    assert_eq!(body["value"], json!("42"));
}

#[tokio::test]
async fn test_get_miss_is_a_normal_outcome() {
    let dir = tempdir().unwrap();
    let state = AppState::new(leader_config(dir.path())).unwrap();
    let app = build_router(state.clone());

    let (status, body) = post_json(&app, "/get", json!({"key": "missing"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["found"], json!(false));
    assert!(body.get("value").is_none());

    assert_eq!(count_events(state.logger.path(), "get_notfound"), 1);
}

#[tokio::test]
async fn test_put_missing_key_is_badreq() {
    let dir = tempdir().unwrap();
    let state = AppState::new(leader_config(dir.path())).unwrap();
    let app = build_router(state.clone());

    // Body without `key`: rejected before any store mutation.
    let (status, body) = post_json(&app, "/put", json!({"value": "42"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("error").is_some());

    // Exactly one badreq line, and nothing landed in the store.
    assert_eq!(count_events(state.logger.path(), "put_badreq"), 1);
    assert_eq!(count_events(state.logger.path(), "put_ok"), 0);

    let (_, body) = post_json(&app, "/get", json!({"key": "x"})).await;
    assert_eq!(body["found"], json!(false));
}

#[tokio::test]
async fn test_put_on_follower_is_rejected_without_mutation() {
    let dir = tempdir().unwrap();
    let state = AppState::new(follower_config(dir.path())).unwrap();
    let app = build_router(state.clone());

    let (status, body) = post_json(&app, "/put", json!({"key": "x", "value": "42"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("not_leader"));

    let (status, body) = post_json(&app, "/get", json!({"key": "x"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], json!(false));

    assert_eq!(count_events(state.logger.path(), "put_reject_not_leader"), 1);
}

#[tokio::test]
async fn test_del_on_leader_reports_removal() {
    let dir = tempdir().unwrap();
    let state = AppState::new(leader_config(dir.path())).unwrap();
    let app = build_router(state);

    post_json(&app, "/put", json!({"key": "x", "value": "42"})).await;

    let (status, body) = post_json(&app, "/del?rid=d1", json!({"key": "x"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["removed"], json!(true));

    // Second delete: nothing left to remove, still a success.
    let (status, body) = post_json(&app, "/del", json!({"key": "x"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], json!(false));

    let (_, body) = post_json(&app, "/get", json!({"key": "x"})).await;
    assert_eq!(body["found"], json!(false));
}

#[tokio::test]
async fn test_del_on_follower_is_rejected() {
    let dir = tempdir().unwrap();
    let state = AppState::new(follower_config(dir.path())).unwrap();
    let app = build_router(state);

    let (status, body) = post_json(&app, "/del", json!({"key": "x"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("not_leader"));
}

#[tokio::test]
async fn test_replicate_apply_is_idempotent() {
    let dir = tempdir().unwrap();
    // Apply works regardless of role; a follower is the usual receiver.
    let state = AppState::new(follower_config(dir.path())).unwrap();
    let app = build_router(state);

    let put = json!({"rid": "r1", "op": "PUT", "key": "x", "value": "42"});
    for _ in 0..2 {
        let (status, body) = post_json(&app, "/internal/replicate", put.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    let (_, body) = post_json(&app, "/get", json!({"key": "x"})).await;
    assert_eq!(body["found"], json!(true));
    assert_eq!(body["value"], json!("42"));

    let del = json!({"rid": "r2", "op": "DEL", "key": "x"});
    for _ in 0..2 {
        let (status, body) = post_json(&app, "/internal/replicate", del.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    let (_, body) = post_json(&app, "/get", json!({"key": "x"})).await;
    assert_eq!(body["found"], json!(false));
}

#[tokio::test]
async fn test_replicate_with_unknown_op_is_badreq() {
    let dir = tempdir().unwrap();
    let state = AppState::new(follower_config(dir.path())).unwrap();
    let app = build_router(state.clone());

    let (status, _) = post_json(
        &app,
        "/internal/replicate",
        json!({"rid": "r1", "op": "NOPE", "key": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(count_events(state.logger.path(), "replicate_badreq"), 1);
}

#[tokio::test]
async fn test_ping_always_succeeds() {
    let dir = tempdir().unwrap();
    let state = AppState::new(leader_config(dir.path())).unwrap();
    let app = build_router(state);

    let (status, body) = get_path(&app, "/internal/ping?from=B").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn test_health_snapshot_shape() {
    let dir = tempdir().unwrap();
    let state = AppState::new(leader_config(dir.path())).unwrap();
    let app = build_router(state.clone());

    // Simulate two probe outcomes so the snapshot has rows.
    state.health.observe("B", true);
    state.health.observe("C", false);

    let (status, body) = get_path(&app, "/internal/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["node_id"], json!("A"));
    assert_eq!(body["role"], json!("leader"));
    assert_eq!(body["peers"][0]["peer_id"], json!("B"));
    assert_eq!(body["peers"][0]["state"], json!("Alive"));
    assert_eq!(body["peers"][1]["peer_id"], json!("C"));
    assert_eq!(body["peers"][1]["state"], json!("Suspected"));
}

#[tokio::test]
async fn test_sequence_advances_once_per_request() {
    let dir = tempdir().unwrap();
    let state = AppState::new(leader_config(dir.path())).unwrap();
    let app = build_router(state.clone());

    post_json(&app, "/put", json!({"key": "x", "value": "1"})).await;
    post_json(&app, "/get", json!({"key": "x"})).await;
    // Internal apply is not client-facing and must not advance it.
    post_json(
        &app,
        "/internal/replicate",
        json!({"rid": "r", "op": "PUT", "key": "y", "value": "2"}),
    )
    .await;

    assert_eq!(state.logger.current_seq(), 2);
}

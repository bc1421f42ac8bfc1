// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! Append-only measurement event log.
//!
//! One JSON object per physical line, flushed before the append returns,
//! so an external reader tailing the file never observes a truncated
//! line. This log is the node's only durable artifact; failure-detection
//! latency analysis consumes it offline. Operator diagnostics go through
//! `tracing` instead and never share this file.
//!
//! Line schema: `{ts_ms, ts_iso, node_id, seq, type, rid?, key?, ...}`
//! where `seq` is the operation sequence counter, advanced exactly once
//! per client-facing request before that request's first line.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub struct EventLogger {
    node_id: String,
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    seq: AtomicU64,
}

impl EventLogger {
    /// Open or create the log file in append mode. Existing lines are
    /// never rewritten.
    pub fn open(node_id: impl Into<String>, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(EventLogger {
            node_id: node_id.into(),
            path,
            writer: Mutex::new(BufWriter::new(file)),
            seq: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Advance the operation sequence counter. Called exactly once per
    /// client-facing request, before any log line for that request.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn current_seq(&self) -> u64 {
        self.seq.load(Ordering::Relaxed)
    }

    /// Append one event line. `extra` must be a JSON object; its fields
    /// are merged into the line. A write failure is a diagnostic, never a
    /// request error.
    pub fn log(&self, event_type: &str, rid: Option<&str>, key: Option<&str>, extra: Value) {
        let now = Utc::now();
        let mut obj = Map::new();
        obj.insert("ts_ms".into(), now.timestamp_millis().into());
        obj.insert(
            "ts_iso".into(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        obj.insert("node_id".into(), Value::String(self.node_id.clone()));
        obj.insert("seq".into(), self.current_seq().into());
        obj.insert("type".into(), Value::String(event_type.to_string()));
        if let Some(rid) = rid {
            obj.insert("rid".into(), Value::String(rid.to_string()));
        }
        if let Some(key) = key {
            obj.insert("key".into(), Value::String(key.to_string()));
        }
        if let Value::Object(extra) = extra {
            for (k, v) in extra {
                obj.insert(k, v);
            }
        }
        let line = Value::Object(obj);

        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            tracing::error!("event log append failed: {e}");
        }
    }
}

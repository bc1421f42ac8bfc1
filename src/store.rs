// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! In-memory key-value state.
//!
//! Plain last-writer-wins map, no versioning, no TTL. The kernel owns no
//! lock; the host wraps the store in its own exclusive-access section.

use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct KvStore {
    entries: FxHashMap<String, String>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional overwrite. Re-applying the same put yields the same
    /// state.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns whether a key was actually removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

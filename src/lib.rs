// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! pulse-kernel: the deterministic core of a Pulse node.
//!
//! Pure state only: the key-value map and the failure-detector state
//! machine. No clocks, no I/O, no locks. Callers supply monotonic
//! millisecond timestamps and own their exclusive-access sections.

pub mod detector;
pub mod store;
pub mod types;

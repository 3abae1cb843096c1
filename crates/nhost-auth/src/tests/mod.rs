//! Integration tests for the auth client.
//!
//! Everything runs against the in-crate harness: a programmable stub
//! backend, a manual clock, and in-memory storage. Timer behavior is pinned
//! down with tokio's paused virtual time.

mod harness;

mod scheduler;

//! Shared helpers for integration tests.

pub mod record_server;

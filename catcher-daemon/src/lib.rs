//! syslog-catcher daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `catcher-daemon` is used as a binary (main.rs).

pub mod health;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
pub mod stream_server;

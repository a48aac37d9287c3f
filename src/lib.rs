//! Keep an HAProxy backend block in sync with a Docker network.
//!
//! backwatch subscribes to connect/disconnect events on one Docker
//! network and converges the proxy config on every change:
//!
//! ```text
//! events ─> debounce ─> snapshot ─> render ─> assemble ─> apply
//!                                                           │
//!                 validate staged copy, atomic rename, SIGUSR2
//! ```
//!
//! - [`docker`] - runtime client: snapshots and the event stream
//! - [`haproxy`] - templates, config assembly, fail-closed apply
//! - [`debounce`] - burst collapsing between events and passes
//! - [`monitor`] - the orchestrator tying the pipeline together
//! - [`commands`] - the `run` / `sync` / `check` CLI entry points

pub mod commands;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod docker;
pub mod error;
pub mod haproxy;
pub mod monitor;

pub use config::{AssembleMode, Config};
pub use error::{Error, Result};

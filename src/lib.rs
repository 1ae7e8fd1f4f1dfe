//! mwtool – diagnostic tools for a pub/sub middleware deployment.
//!
//! This crate exports
//!  * `core`      – subscription client, rendering policy and data model
//!  * `broker`    – discovery/connector capability traits and the TCP connector
//!  * `net`       – length-prefixed frame codec spoken by the broker
//!  * `cli`       – explicit command registry, dispatcher and commands
//!  * `config`    – TOML-driven configuration with env overrides
//!  * `buildinfo` – static build metadata report
//!
//! The `mwtool` binary under `src/bin/` wires these together.

// ───────────────────────────────────────────────────────────
// Public modules
// ───────────────────────────────────────────────────────────
pub mod broker;
pub mod buildinfo;
pub mod cli;
pub mod config;
pub mod core;
pub mod logging;
pub mod net;
pub mod shutdown;

// ───────────────────────────────────────────────────────────
// Re-exports
// ───────────────────────────────────────────────────────────
pub use crate::config::{Config, ConfigError};
pub use crate::core::{InboundMessage, RenderMode, Server, Subscription, ToolError};

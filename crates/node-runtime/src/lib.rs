//! # Node Runtime Library
//!
//! This library exposes the internal modules of the node runtime for testing.
//! The main entry point is the `main.rs` binary.
//!
//! - `config` - TOML configuration and environment overrides
//! - `keys` - cold/hot key generation and signer loading
//! - `adapters` - file-backed ledger
//! - `node` - wiring of registry, sync engine and dispatcher

#![warn(missing_docs)]

pub mod adapters;
pub mod config;
pub mod keys;
pub mod node;

pub use config::{ConfigError, NodeConfig};
pub use node::{resolve_once, NodeRuntime};

//! Adapters for persisting the name list.

pub mod snapshot;

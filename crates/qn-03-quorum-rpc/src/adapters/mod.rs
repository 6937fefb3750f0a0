//! Transport adapters.

pub mod udp;

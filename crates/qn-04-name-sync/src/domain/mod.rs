//! Domain layer.

pub mod authority;
pub mod config;
pub mod errors;
pub mod filter;
pub mod merge;
pub mod signer;

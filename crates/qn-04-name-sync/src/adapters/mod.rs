//! Adapters for the outbound ports.

pub mod ledger_authority;
pub mod memory_ledger;

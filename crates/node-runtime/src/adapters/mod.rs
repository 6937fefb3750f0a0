//! Host-side adapters for the sync engine ports.

pub mod file_ledger;

pub use file_ledger::FileLedger;

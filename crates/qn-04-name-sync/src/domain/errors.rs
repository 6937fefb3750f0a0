//! Synchronization errors.

use qn_02_name_records::{RecordError, StoreError};
use qn_03_quorum_rpc::RpcError;
use thiserror::Error;

/// Failure talking to the ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Ledger could not be reached or read.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// Ledger answered with data we cannot use.
    #[error("Malformed ledger data: {0}")]
    Malformed(String),
}

/// Failure of a sync, refresh or gossip round.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Ledger call failed; the pass is retried after the backoff.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// No usable signing key on record for the authority.
    #[error("No authority keys for {0}")]
    NoAuthorityKeys(String),

    /// A record could not be built from filtered ledger data.
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Snapshot could not be read or written.
    #[error("Snapshot error: {0}")]
    Store(#[from] StoreError),

    /// Peer exchange failed.
    #[error("Peer exchange failed: {0}")]
    Rpc(#[from] RpcError),

    /// Refresh or gossip with nobody to ask.
    #[error("No peers configured")]
    NoPeers,
}

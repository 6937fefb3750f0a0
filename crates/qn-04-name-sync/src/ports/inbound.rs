//! Driving port: the operations the node runtime invokes.

use crate::domain::errors::SyncError;
use crate::domain::merge::MergeReport;
use async_trait::async_trait;

/// Outcome of one hot-key refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyRefreshReport {
    /// Identities seen for the first time.
    pub added: usize,
    /// Identities whose hot key changed.
    pub rotated: usize,
    /// Bindings identical to what we hold.
    pub unchanged: usize,
    /// Foreign keys offered for our own identity.
    pub rejected: usize,
    /// Signatures dropped because of rotations.
    pub purged_signatures: usize,
}

/// Single rounds of each background loop.
#[async_trait]
pub trait NameSyncApi: Send + Sync {
    /// Fetch the ledger list and merge it into the registry.
    async fn sync_pass(&self) -> Result<MergeReport, SyncError>;

    /// Ask one random peer for the trusted signers' hot keys.
    async fn refresh_hot_keys_once(&self) -> Result<KeyRefreshReport, SyncError>;

    /// Fill in missing signatures on one under-signed record.
    /// Returns how many signatures were adopted.
    async fn gossip_signatures_once(&self) -> Result<usize, SyncError>;
}

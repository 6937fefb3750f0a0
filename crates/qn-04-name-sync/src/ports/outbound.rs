//! # Driven Ports
//!
//! What the sync engine needs from the host: a view of the name ledger
//! and a source of authority signing keys.

use crate::domain::authority::AuthorityKeyMap;
use crate::domain::errors::{LedgerError, SyncError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One historical value of a ledger name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameHistoryEntry {
    /// Value JSON as stored on the ledger.
    pub value: String,
    /// Height at which the name was first registered.
    pub first_seen: u32,
    /// Height of the block carrying this value.
    pub block_height: u32,
}

/// A current ledger name under some prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerName {
    /// Full ledger name, alias suffix included.
    pub name: String,
    /// Value JSON as stored on the ledger.
    pub value: String,
    /// Height at which the name was first registered.
    pub first_seen: u32,
}

/// Read access to the public name ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Every value `name` has held, oldest first.
    async fn name_history(&self, name: &str) -> Result<Vec<NameHistoryEntry>, LedgerError>;

    /// Current names starting with `prefix`, in any order.
    async fn name_filter(&self, prefix: &str) -> Result<Vec<LedgerName>, LedgerError>;

    /// Current ledger height.
    async fn block_height(&self) -> Result<u32, LedgerError>;
}

/// Supplies the keys allowed to authorize names in a zone.
#[async_trait]
pub trait AuthorityResolver: Send + Sync {
    /// Height-indexed signing keys published under `authority_name`.
    async fn keys_for_zone(&self, authority_name: &str) -> Result<AuthorityKeyMap, SyncError>;
}

//! Sync engine settings.

use qn_02_name_records::SignerId;
use std::net::SocketAddr;
use std::time::Duration;

/// Settings for the sync, hot-key and gossip loops.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Ledger prefix of the zone, e.g. `"h/"`.
    pub name_prefix: String,
    /// Domain of the zone authority, e.g. `"nic.h"`.
    pub authority_domain: String,
    /// Pause between successful sync passes.
    pub sync_interval: Duration,
    /// Pause after a failed pass.
    pub ledger_backoff: Duration,
    /// Upper bound of the random hot-key refresh delay.
    pub hot_key_refresh_max: Duration,
    /// Upper bound of the random gossip delay.
    pub gossip_max: Duration,
    /// Merge steps taken per write-lock hold before yielding.
    pub merge_batch_size: usize,
    /// Cold keys of the signer group, this node's included.
    pub trusted_keys: Vec<SignerId>,
    /// Fellow signers to refresh keys and gossip with.
    pub peers: Vec<SocketAddr>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            name_prefix: "h/".to_string(),
            authority_domain: "nic.h".to_string(),
            sync_interval: Duration::from_secs(60),
            ledger_backoff: Duration::from_secs(60),
            hot_key_refresh_max: Duration::from_secs(120),
            gossip_max: Duration::from_secs(10),
            merge_batch_size: 1,
            trusted_keys: Vec::new(),
            peers: Vec::new(),
        }
    }
}

//! Authority keys read from the ledger history of the authority name.
//!
//! Each history value is JSON carrying a hex `signingKey`; the key takes
//! effect at the height of the block holding that value.

use crate::domain::authority::AuthorityKeyMap;
use crate::domain::errors::SyncError;
use crate::ports::outbound::{AuthorityResolver, LedgerClient};
use async_trait::async_trait;
use serde::Deserialize;
use shared_crypto::Ed25519PublicKey;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorityValue {
    signing_key: String,
}

/// [`AuthorityResolver`] backed by a [`LedgerClient`].
pub struct LedgerAuthorityResolver<L: LedgerClient> {
    ledger: Arc<L>,
}

impl<L: LedgerClient> LedgerAuthorityResolver<L> {
    /// Resolver reading through `ledger`.
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl<L: LedgerClient> AuthorityResolver for LedgerAuthorityResolver<L> {
    async fn keys_for_zone(&self, authority_name: &str) -> Result<AuthorityKeyMap, SyncError> {
        let history = self.ledger.name_history(authority_name).await?;

        let mut keys = AuthorityKeyMap::new();
        for entry in history {
            let key = serde_json::from_str::<AuthorityValue>(&entry.value)
                .map_err(|e| e.to_string())
                .and_then(|v| Ed25519PublicKey::from_hex(&v.signing_key).map_err(|e| e.to_string()));
            match key {
                Ok(key) => keys.insert(entry.block_height, key),
                Err(e) => warn!(
                    authority = authority_name,
                    height = entry.block_height,
                    error = %e,
                    "Skipping malformed authority entry"
                ),
            }
        }

        if keys.is_empty() {
            return Err(SyncError::NoAuthorityKeys(authority_name.to_string()));
        }
        debug!(authority = authority_name, keys = keys.len(), "Resolved authority keys");
        Ok(keys)
    }
}

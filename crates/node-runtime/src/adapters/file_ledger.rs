//! # File Ledger
//!
//! A [`LedgerClient`] over a JSON export of the ledger, re-read on every
//! call so an external exporter can rewrite it while the node runs:
//!
//! ```json
//! {
//!   "height": 420000,
//!   "names": [
//!     { "name": "h/example/", "value": "{\"ip6\":\"fc00::1\",\"auth\":\"..\"}", "first_seen": 1200 }
//!   ],
//!   "history": {
//!     "h/nic/": [
//!       { "value": "{\"signingKey\":\"..\"}", "first_seen": 1, "block_height": 1 }
//!     ]
//!   }
//! }
//! ```

use async_trait::async_trait;
use qn_04_name_sync::{LedgerClient, LedgerError, LedgerName, NameHistoryEntry};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct LedgerExport {
    height: u32,
    #[serde(default)]
    names: Vec<LedgerName>,
    #[serde(default)]
    history: HashMap<String, Vec<NameHistoryEntry>>,
}

/// Ledger backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    /// Ledger reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<LedgerExport, LedgerError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| LedgerError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| LedgerError::Malformed(format!("{}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl LedgerClient for FileLedger {
    async fn name_history(&self, name: &str) -> Result<Vec<NameHistoryEntry>, LedgerError> {
        let mut export = self.read().await?;
        Ok(export.history.remove(name).unwrap_or_default())
    }

    async fn name_filter(&self, prefix: &str) -> Result<Vec<LedgerName>, LedgerError> {
        let export = self.read().await?;
        let names: Vec<_> = export
            .names
            .into_iter()
            .filter(|n| n.name.starts_with(prefix))
            .collect();
        debug!(prefix, count = names.len(), "Read ledger names");
        Ok(names)
    }

    async fn block_height(&self) -> Result<u32, LedgerError> {
        Ok(self.read().await?.height)
    }
}

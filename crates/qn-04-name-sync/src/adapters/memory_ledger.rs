//! In-memory ledger for tests and local runs.

use crate::domain::errors::LedgerError;
use crate::ports::outbound::{LedgerClient, LedgerName, NameHistoryEntry};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct LedgerState {
    height: u32,
    names: Vec<LedgerName>,
    history: HashMap<String, Vec<NameHistoryEntry>>,
    unavailable: bool,
}

/// A [`LedgerClient`] whose contents are set directly.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Empty ledger at height 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current height.
    pub fn set_height(&self, height: u32) {
        self.state.write().height = height;
    }

    /// Replace the current name listing.
    pub fn set_names(&self, names: Vec<LedgerName>) {
        self.state.write().names = names;
    }

    /// Append a historical value for `name`.
    pub fn push_history(&self, name: &str, entry: NameHistoryEntry) {
        self.state
            .write()
            .history
            .entry(name.to_string())
            .or_default()
            .push(entry);
    }

    /// Make every call fail until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unavailable = unavailable;
    }

    fn check_available(state: &LedgerState) -> Result<(), LedgerError> {
        if state.unavailable {
            return Err(LedgerError::Unavailable("ledger offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn name_history(&self, name: &str) -> Result<Vec<NameHistoryEntry>, LedgerError> {
        let state = self.state.read();
        Self::check_available(&state)?;
        Ok(state.history.get(name).cloned().unwrap_or_default())
    }

    async fn name_filter(&self, prefix: &str) -> Result<Vec<LedgerName>, LedgerError> {
        let state = self.state.read();
        Self::check_available(&state)?;
        Ok(state
            .names
            .iter()
            .filter(|n| n.name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn block_height(&self) -> Result<u32, LedgerError> {
        let state = self.state.read();
        Self::check_available(&state)?;
        Ok(state.height)
    }
}

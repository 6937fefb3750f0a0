//! # Name Synchronization
//!
//! Keeps the node's signed name list in step with the ledger and with its
//! fellow signers.
//!
//! ## Loops
//!
//! | Loop | Cadence | Work |
//! |------|---------|------|
//! | sync | pass, then `sync_interval` (or `ledger_backoff` on error) | fetch, filter, merge, sign, persist |
//! | hot keys | uniform random in `[0, hot_key_refresh_max)` | refresh the [`HotKeySet`](qn_02_name_records::HotKeySet) from a random peer |
//! | gossip | uniform random in `[0, gossip_max)` | fill in missing signatures on one record |
//!
//! ## Architecture
//!
//! - **Domain Layer:** authority checks, the filter pass, the step-wise
//!   [`MergeJob`] and [`LocalSigner`].
//! - **Ports Layer:** [`LedgerClient`] and [`AuthorityResolver`] outbound,
//!   [`NameSyncApi`] inbound.
//! - **Adapters Layer:** in-memory ledger and a ledger-backed authority
//!   resolver.
//! - [`NameRegistry`]: the shared list and key set, also the record source
//!   for the request dispatcher.
//! - [`NameSyncService`]: wires it together and runs the loops.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod registry;
pub mod service;

pub use adapters::ledger_authority::LedgerAuthorityResolver;
pub use adapters::memory_ledger::InMemoryLedger;
pub use domain::authority::{
    auth_message, authority_name, authorize, is_authorized, AuthorityKeyMap,
};
pub use domain::config::SyncConfig;
pub use domain::errors::{LedgerError, SyncError};
pub use domain::filter::{filter_names, FilterOutcome, RejectReason, MAX_NAME_LEN};
pub use domain::merge::{MergeJob, MergeReport};
pub use domain::signer::LocalSigner;
pub use ports::inbound::{KeyRefreshReport, NameSyncApi};
pub use ports::outbound::{AuthorityResolver, LedgerClient, LedgerName, NameHistoryEntry};
pub use registry::NameRegistry;
pub use service::NameSyncService;

//! # Name Sync Service
//!
//! Drives the [`NameRegistry`] from the ledger and from peers.
//!
//! ## Sync pass
//!
//! 1. ledger height, zone listing and authority keys
//! 2. [`filter_names`]
//! 3. [`MergeJob`], one write-lock hold per batch of steps, yielding to the
//!    runtime between batches so the dispatcher keeps answering
//! 4. invariant check, snapshot
//!
//! ## Dependencies
//!
//! - `L: LedgerClient` - zone listing and height
//! - `A: AuthorityResolver` - authority keys for the filter
//! - `X: QuorumExchange` - hot-key refresh and signature gossip

use crate::domain::authority::authority_name;
use crate::domain::config::SyncConfig;
use crate::domain::errors::SyncError;
use crate::domain::filter::filter_names;
use crate::domain::merge::{MergeJob, MergeReport};
use crate::domain::signer::LocalSigner;
use crate::ports::inbound::{KeyRefreshReport, NameSyncApi};
use crate::ports::outbound::{AuthorityResolver, LedgerClient};
use crate::registry::NameRegistry;
use async_trait::async_trait;
use qn_02_name_records::{KeyUpdate, SnapshotStore};
use qn_03_quorum_rpc::QuorumExchange;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Synchronization engine for one node.
pub struct NameSyncService<L, A, X>
where
    L: LedgerClient,
    A: AuthorityResolver,
    X: QuorumExchange,
{
    config: SyncConfig,
    registry: Arc<NameRegistry>,
    signer: LocalSigner,
    ledger: Arc<L>,
    authority: Arc<A>,
    exchange: Arc<X>,
    store: Option<SnapshotStore>,
}

impl<L, A, X> NameSyncService<L, A, X>
where
    L: LedgerClient,
    A: AuthorityResolver,
    X: QuorumExchange,
{
    pub fn new(
        config: SyncConfig,
        registry: Arc<NameRegistry>,
        signer: LocalSigner,
        ledger: Arc<L>,
        authority: Arc<A>,
        exchange: Arc<X>,
    ) -> Self {
        Self {
            config,
            registry,
            signer,
            ledger,
            authority,
            exchange,
            store: None,
        }
    }

    /// Persist the list to `store` after every pass.
    #[must_use]
    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<NameRegistry> {
        &self.registry
    }

    /// Settings in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn random_peer(&self) -> Option<SocketAddr> {
        if self.config.peers.is_empty() {
            return None;
        }
        let i = rand::thread_rng().gen_range(0..self.config.peers.len());
        Some(self.config.peers[i])
    }

    fn random_delay(max: Duration) -> Duration {
        if max.is_zero() {
            return max;
        }
        rand::thread_rng().gen_range(Duration::ZERO..max)
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    /// Load the snapshot into the registry. Signatures that do not verify
    /// under the hot key currently held for their identity are dropped.
    /// Returns the number of records loaded.
    pub fn load_snapshot(&self) -> Result<usize, SyncError> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let mut list = store.load()?;

        let mut dropped = 0;
        {
            let keys = self.registry.hot_keys();
            for record in list.iter_mut() {
                let stale: Vec<_> = record
                    .signatures()
                    .iter()
                    .filter(|(id, sig)| {
                        keys.hot_key(id)
                            .is_some_and(|hot| !record.verify_signature(sig, &hot))
                    })
                    .map(|(id, _)| *id)
                    .collect();
                for id in stale {
                    record.purge_signer(&id);
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            warn!(dropped, "Dropped snapshot signatures that no longer verify");
        }
        if let Err(violation) = list.verify_invariants() {
            warn!(error = %violation, "Snapshot list is inconsistent, next sync will repair it");
        }

        let count = list.len();
        self.registry.replace_names(list);
        Ok(count)
    }

    /// Write the snapshot on the blocking pool.
    async fn persist(&self) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let snapshot = self.registry.snapshot();
        let path = store.path().to_path_buf();
        match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(path = %path.display(), error = %e, "Failed to store snapshot"),
            Err(e) => warn!(path = %path.display(), error = %e, "Snapshot writer task failed"),
        }
    }

    // =========================================================================
    // Loops
    // =========================================================================

    /// Run sync passes until shutdown.
    pub async fn run_sync_loop(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let delay = match self.sync_pass().await {
                Ok(_) => self.config.sync_interval,
                Err(e) => {
                    warn!(error = %e, backoff_s = self.config.ledger_backoff.as_secs(), "Sync pass failed");
                    self.config.ledger_backoff
                }
            };
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }
        debug!("Sync loop stopped");
    }

    /// Refresh hot keys at random intervals until shutdown.
    pub async fn run_hot_key_loop(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Self::random_delay(self.config.hot_key_refresh_max)) => {}
                _ = shutdown.changed() => break,
            }
            match self.refresh_hot_keys_once().await {
                Ok(report) if report.added + report.rotated > 0 => {
                    info!(added = report.added, rotated = report.rotated, "Hot keys refreshed");
                }
                Ok(_) | Err(SyncError::NoPeers) => {}
                Err(e) => warn!(error = %e, "Hot-key refresh failed"),
            }
        }
        debug!("Hot-key loop stopped");
    }

    /// Gossip signatures at random intervals until shutdown.
    pub async fn run_gossip_loop(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Self::random_delay(self.config.gossip_max)) => {}
                _ = shutdown.changed() => break,
            }
            match self.gossip_signatures_once().await {
                Ok(_) | Err(SyncError::NoPeers) => {}
                Err(e) => debug!(error = %e, "Signature gossip failed"),
            }
        }
        debug!("Gossip loop stopped");
    }

    /// Run all three loops until shutdown.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        tokio::join!(
            self.run_sync_loop(shutdown.clone()),
            self.run_hot_key_loop(shutdown.clone()),
            self.run_gossip_loop(shutdown),
        );
        self.persist().await;
    }
}

#[async_trait]
impl<L, A, X> NameSyncApi for NameSyncService<L, A, X>
where
    L: LedgerClient,
    A: AuthorityResolver,
    X: QuorumExchange,
{
    async fn sync_pass(&self) -> Result<MergeReport, SyncError> {
        let height = self.ledger.block_height().await?;
        let listing = self.ledger.name_filter(&self.config.name_prefix).await?;
        let authority = authority_name(&self.config.authority_domain);
        let keys = self.authority.keys_for_zone(&authority).await?;

        let fetched = listing.len();
        let outcome = filter_names(listing, &keys);
        for (name, reason) in &outcome.rejected {
            debug!(name = %name, reason = %reason, "Filtered out ledger name");
        }

        let batch = self.config.merge_batch_size.max(1);
        let mut job = MergeJob::new(outcome.accepted, height);
        while !job.is_done() {
            {
                let hot_keys = self.registry.hot_keys();
                let mut names = self.registry.names_mut();
                for _ in 0..batch {
                    job.step(&mut names, &self.signer, &hot_keys)?;
                }
            }
            tokio::task::yield_now().await;
        }

        let report = {
            let mut names = self.registry.names_mut();
            let report = job.finish(&mut names);
            if let Err(violation) = names.verify_invariants() {
                error!(error = %violation, "Name list invariant violated after merge");
            }
            report
        };

        info!(
            height,
            fetched,
            accepted = fetched - outcome.rejected.len(),
            appended = report.appended,
            inserted = report.inserted,
            updated = report.updated,
            removed = report.removed + report.trimmed,
            signed = report.signed,
            "Sync pass complete"
        );
        self.persist().await;
        Ok(report)
    }

    async fn refresh_hot_keys_once(&self) -> Result<KeyRefreshReport, SyncError> {
        let peer = self.random_peer().ok_or(SyncError::NoPeers)?;
        let bindings = self
            .exchange
            .lookup_hot_keys(&self.config.trusted_keys, peer)
            .await?;

        let mut report = KeyRefreshReport::default();
        let mut keys = self.registry.hot_keys_mut();
        for (identity, binding) in bindings {
            match keys.apply(identity, binding) {
                KeyUpdate::Added => {
                    // restored signatures may predate a rotation we never saw
                    let purged = self
                        .registry
                        .names_mut()
                        .purge_unverified(&identity, &binding.hot_key);
                    if purged > 0 {
                        info!(signer = %identity, purged, "Dropped signatures made under an older hot key");
                    }
                    debug!(signer = %identity, peer = %peer, "Learned hot key");
                    report.added += 1;
                    report.purged_signatures += purged;
                }
                KeyUpdate::Unchanged => report.unchanged += 1,
                KeyUpdate::Rotated => {
                    let purged = self.registry.names_mut().purge_signer(&identity);
                    info!(signer = %identity, purged, "Hot key rotated, dropped stale signatures");
                    report.rotated += 1;
                    report.purged_signatures += purged;
                }
                KeyUpdate::RejectedSelf => {
                    warn!(peer = %peer, "Peer offered a foreign hot key for our identity");
                    report.rejected += 1;
                }
            }
        }
        Ok(report)
    }

    async fn gossip_signatures_once(&self) -> Result<usize, SyncError> {
        let peer = self.random_peer().ok_or(SyncError::NoPeers)?;

        let (name, binary, hot_keys) = {
            let keys = self.registry.hot_keys();
            let names = self.registry.names();
            if names.is_empty() {
                return Ok(0);
            }
            let start = rand::thread_rng().gen_range(0..names.len());
            let wanting = (0..names.len())
                .map(|i| &names.records()[(start + i) % names.len()])
                .find(|r| r.signatures().len() < keys.len());
            let Some(record) = wanting else {
                return Ok(0);
            };
            (
                record.name().to_string(),
                record.binary().to_vec(),
                keys.hot_keys_sorted(),
            )
        };

        let reply = self.exchange.lookup_record(&name, &hot_keys, peer).await?;
        if reply.binary != binary {
            debug!(name = %name, peer = %peer, "Peer holds different content, not adopting");
            return Ok(0);
        }

        let mut names = self.registry.names_mut();
        let Some(index) = names.position_of(&name) else {
            return Ok(0);
        };
        let Some(record) = names.get_mut(index) else {
            return Ok(0);
        };
        if record.binary() != binary.as_slice() {
            // changed by a sync pass while we waited
            return Ok(0);
        }

        let mut adopted = 0;
        for (identity, sig) in reply.signatures.iter() {
            if !record.signatures().contains(identity) {
                record.add_signature(*identity, *sig);
                adopted += 1;
            }
        }
        if adopted > 0 {
            debug!(name = %name, peer = %peer, adopted, "Adopted gossiped signatures");
        }
        Ok(adopted)
    }
}

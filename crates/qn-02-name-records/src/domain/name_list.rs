//! # Ordered Name List
//!
//! Records sorted by [`compare_names`] over full names, linked into a ring
//! by their successor names. Lookup returns the record whose range
//! `[name, next)` covers the query, which doubles as a signed proof that a
//! name does not exist.

use crate::domain::comparator::{canonical_name, compare_names};
use crate::domain::errors::InvariantViolation;
use crate::domain::identity::SignerId;
use crate::domain::record::NameRecord;
use shared_crypto::Ed25519PublicKey;
use std::cmp::Ordering;

/// The node's ordered, ring-linked record list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameList {
    records: Vec<NameRecord>,
}

impl NameList {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt records that are already in order.
    #[must_use]
    pub fn from_records(records: Vec<NameRecord>) -> Self {
        Self { records }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&NameRecord> {
        self.records.get(index)
    }

    /// Mutable record at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut NameRecord> {
        self.records.get_mut(index)
    }

    /// All records in order.
    #[must_use]
    pub fn records(&self) -> &[NameRecord] {
        &self.records
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, NameRecord> {
        self.records.iter()
    }

    /// Iterate mutably in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, NameRecord> {
        self.records.iter_mut()
    }

    /// Insert before `index`. Caller keeps the order.
    pub fn insert(&mut self, index: usize, record: NameRecord) {
        self.records.insert(index, record);
    }

    /// Append at the end. Caller keeps the order.
    pub fn push(&mut self, record: NameRecord) {
        self.records.push(record);
    }

    /// Remove the record at `index`.
    pub fn remove(&mut self, index: usize) -> NameRecord {
        self.records.remove(index)
    }

    /// Drop every record from `len` on.
    pub fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Index of the record covering the canonical name `name`.
    ///
    /// Searches for `name + "/"`, the smallest full name with that prefix.
    /// An alias with a longer suffix sits immediately after the search
    /// point and is returned directly. Otherwise the greatest record not
    /// after the query wins, wrapping to the last record.
    #[must_use]
    pub fn lookup_index(&self, name: &str) -> Option<usize> {
        if self.records.is_empty() {
            return None;
        }
        let query = format!("{}/", name);
        let split = self
            .records
            .partition_point(|r| compare_names(r.full_name(), &query) != Ordering::Greater);

        if let Some(next) = self.records.get(split) {
            if canonical_name(next.full_name()) == name {
                return Some(split);
            }
        }
        Some(split.checked_sub(1).unwrap_or(self.records.len() - 1))
    }

    /// Record covering the canonical name `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&NameRecord> {
        self.lookup_index(name).map(|i| &self.records[i])
    }

    /// Index of the record whose canonical name is exactly `name`.
    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.lookup_index(name)
            .filter(|i| self.records[*i].name() == name)
    }

    // =========================================================================
    // Signature maintenance
    // =========================================================================

    /// Drop `identity`'s signature from every record. Returns how many were held.
    pub fn purge_signer(&mut self, identity: &SignerId) -> usize {
        self.records
            .iter_mut()
            .map(|r| r.purge_signer(identity))
            .filter(|held| *held)
            .count()
    }

    /// Drop `identity`'s signatures that do not verify under `hot_key`.
    /// Returns how many were dropped.
    pub fn purge_unverified(&mut self, identity: &SignerId, hot_key: &Ed25519PublicKey) -> usize {
        self.records
            .iter_mut()
            .filter(|r| {
                r.signatures()
                    .get(identity)
                    .is_some_and(|sig| !r.verify_signature(sig, hot_key))
            })
            .map(|r| r.purge_signer(identity))
            .filter(|held| *held)
            .count()
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Check ring links, strict ordering and lookup consistency.
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        let len = self.records.len();
        for (index, record) in self.records.iter().enumerate() {
            let prev = &self.records[(index + len - 1) % len];
            if prev.next_full_name() != record.full_name() {
                return Err(InvariantViolation::BrokenLink {
                    index,
                    expected: record.full_name().to_string(),
                    found: prev.next_full_name().to_string(),
                });
            }
            if index > 0 && compare_names(prev.full_name(), record.full_name()) != Ordering::Less {
                return Err(InvariantViolation::OutOfOrder { index });
            }
        }
        // lookups are only meaningful once the order is known to hold
        for (index, record) in self.records.iter().enumerate() {
            if self.lookup_index(record.name()) != Some(index) {
                return Err(InvariantViolation::LookupMismatch {
                    index,
                    name: record.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

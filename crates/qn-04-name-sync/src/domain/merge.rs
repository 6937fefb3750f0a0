//! # Merge Job
//!
//! Walks the filtered ledger listing and the held [`NameList`] in lockstep,
//! one incoming entry per [`MergeJob::step`], so the caller can release the
//! list between steps.
//!
//! For incoming entry `i` with list cursor `j`:
//!
//! 1. while `list[j]` has another canonical name and sorts before the
//!    entry, remove it (gone upstream)
//! 2. list exhausted: append; same canonical name: update in place;
//!    otherwise: insert before `j`
//! 3. refresh the height, sign, advance both cursors
//!
//! The successor of entry `i` is entry `(i + 1) % len`. Once every entry
//! is consumed, [`MergeJob::finish`] drops whatever trails the cursor.
//! Updates that leave the signed bytes unchanged keep their signatures.

use crate::domain::signer::LocalSigner;
use crate::ports::outbound::LedgerName;
use qn_02_name_records::{canonical_name, compare_names, HotKeySet, NameList, NameRecord, RecordError};
use std::cmp::Ordering;
use tracing::debug;

/// Counts from one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Records added at the end of the list.
    pub appended: usize,
    /// Records added before an existing one.
    pub inserted: usize,
    /// Existing records whose signed content changed.
    pub updated: usize,
    /// Existing records left as they were.
    pub unchanged: usize,
    /// Records removed mid-list.
    pub removed: usize,
    /// Records removed from the tail.
    pub trimmed: usize,
    /// Records this node signed.
    pub signed: usize,
}

impl MergeReport {
    /// True when the list was not altered.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.appended + self.inserted + self.updated + self.removed + self.trimmed == 0
    }
}

/// An in-progress merge.
#[derive(Debug)]
pub struct MergeJob {
    incoming: Vec<LedgerName>,
    ledger_height: u32,
    next_in: usize,
    cursor: usize,
    report: MergeReport,
}

impl MergeJob {
    /// Merge `incoming` (filtered, comparator order) at `ledger_height`.
    #[must_use]
    pub fn new(incoming: Vec<LedgerName>, ledger_height: u32) -> Self {
        Self {
            incoming,
            ledger_height,
            next_in: 0,
            cursor: 0,
            report: MergeReport::default(),
        }
    }

    /// True once every incoming entry is consumed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.next_in >= self.incoming.len()
    }

    /// Entries still to merge.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.incoming.len() - self.next_in
    }

    /// Merge the next incoming entry into `list`. No-op when done.
    pub fn step(
        &mut self,
        list: &mut NameList,
        signer: &LocalSigner,
        keys: &HotKeySet,
    ) -> Result<(), RecordError> {
        let Some(entry) = self.incoming.get(self.next_in) else {
            return Ok(());
        };
        let next_full = &self.incoming[(self.next_in + 1) % self.incoming.len()].name;
        let canonical = canonical_name(&entry.name);
        let j = self.cursor;

        while let Some(current) = list.get(j) {
            if current.name() == canonical
                || compare_names(current.full_name(), &entry.name) != Ordering::Less
            {
                break;
            }
            debug!(name = %current.full_name(), "Removing name gone from ledger");
            list.remove(j);
            self.report.removed += 1;
        }

        match list.get_mut(j) {
            Some(current) if current.name() == canonical => {
                current.set_first_seen(entry.first_seen);
                let mut dirtied = current.set_full_name(&entry.name)?;
                dirtied |= current.set_value(&entry.value)?;
                dirtied |= current.set_next_full_name(next_full)?;
                if dirtied {
                    debug!(name = %entry.name, "Updated name");
                    self.report.updated += 1;
                }
            }
            Some(_) => {
                let record = NameRecord::new(&entry.name, next_full, &entry.value, entry.first_seen)?;
                debug!(name = %entry.name, index = j, "Inserting name");
                list.insert(j, record);
                self.report.inserted += 1;
            }
            None => {
                let record = NameRecord::new(&entry.name, next_full, &entry.value, entry.first_seen)?;
                debug!(name = %entry.name, "Appending name");
                list.push(record);
                self.report.appended += 1;
            }
        }

        if let Some(record) = list.get_mut(j) {
            let was_signed = !record.signatures().is_empty();
            let refreshed = record.set_height(self.ledger_height)?;
            if refreshed && was_signed {
                debug!(name = %record.name(), height = record.height(), "Height rolled over");
            }
            if signer.sign(record, keys) {
                self.report.signed += 1;
            }
        }

        self.cursor += 1;
        self.next_in += 1;
        Ok(())
    }

    /// Drop records past the merged range and return the counts.
    pub fn finish(mut self, list: &mut NameList) -> MergeReport {
        let trailing = list.len().saturating_sub(self.cursor);
        if trailing > 0 {
            debug!(count = trailing, "Trimming trailing names");
            list.truncate(self.cursor);
        }
        self.report.trimmed = trailing;
        self.report.unchanged = self.incoming.len()
            - self.report.appended
            - self.report.inserted
            - self.report.updated;
        self.report
    }

    /// Step to completion, then finish.
    pub fn run_to_end(
        mut self,
        list: &mut NameList,
        signer: &LocalSigner,
        keys: &HotKeySet,
    ) -> Result<MergeReport, RecordError> {
        while !self.is_done() {
            self.step(list, signer, keys)?;
        }
        Ok(self.finish(list))
    }
}

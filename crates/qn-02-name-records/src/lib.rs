//! # Name Records
//!
//! The in-memory state a Quorum-Names node attests to.
//!
//! ## Architecture
//!
//! - **Domain Layer:** [`NameRecord`] with dirty-tracked signable content,
//!   the name [`comparator`](domain::comparator), the ordered
//!   [`NameList`] with bracketing lookup, and the [`HotKeySet`] of signer
//!   bindings.
//! - **Adapters Layer:** [`SnapshotStore`], an integrity-hashed file
//!   snapshot of the list.
//!
//! ## Ordering Invariants
//!
//! | Invariant | Check |
//! |-----------|-------|
//! | successor link | `records[i].next_full_name() == records[i + 1].full_name()`, wrapping |
//! | strict order | `compare_names(records[i - 1], records[i]) == Less` |
//! | unique key | one record per canonical name |
//! | lookup | `lookup(r.name())` returns `r` |
//!
//! [`NameList::verify_invariants`] checks all of them.

pub mod adapters;
pub mod domain;

pub use adapters::snapshot::{decode_snapshot, encode_snapshot, SnapshotStore, MAX_SNAPSHOT_PAYLOAD};
pub use domain::comparator::{canonical_name, compare_names};
pub use domain::errors::{InvariantViolation, RecordError, StoreError};
pub use domain::hot_keys::{HotKeySet, KeyUpdate};
pub use domain::identity::{HotKeyBinding, SignerId};
pub use domain::name_list::NameList;
pub use domain::record::{
    canonical_value, compose_height, name_salt, NameRecord, SignableContent, SignatureSet,
    HEIGHT_SALT_MASK,
};

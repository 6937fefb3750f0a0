//! # Name Registry
//!
//! The node's shared state: the signed [`NameList`] and the [`HotKeySet`].
//! The sync engine is the only writer; the dispatcher and resolver calls
//! read.
//!
//! ## Lock order
//!
//! Take `hot_keys` before `names` whenever both are held.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use qn_02_name_records::{HotKeyBinding, HotKeySet, NameList, NameRecord, SignerId};
use qn_03_quorum_rpc::{RecordSource, SignedLookup};
use shared_crypto::{Ed25519PublicKey, Ed25519Signature, PUBLIC_KEY_SIZE};

/// Name list and signer keys behind read/write locks.
#[derive(Debug)]
pub struct NameRegistry {
    hot_keys: RwLock<HotKeySet>,
    names: RwLock<NameList>,
}

impl NameRegistry {
    /// Empty list with the given key set.
    #[must_use]
    pub fn new(hot_keys: HotKeySet) -> Self {
        Self::with_names(hot_keys, NameList::new())
    }

    /// Start from an existing list.
    #[must_use]
    pub fn with_names(hot_keys: HotKeySet, names: NameList) -> Self {
        Self {
            hot_keys: RwLock::new(hot_keys),
            names: RwLock::new(names),
        }
    }

    /// Read access to the key set.
    pub fn hot_keys(&self) -> RwLockReadGuard<'_, HotKeySet> {
        self.hot_keys.read()
    }

    /// Write access to the key set.
    pub fn hot_keys_mut(&self) -> RwLockWriteGuard<'_, HotKeySet> {
        self.hot_keys.write()
    }

    /// Read access to the list.
    pub fn names(&self) -> RwLockReadGuard<'_, NameList> {
        self.names.read()
    }

    /// Write access to the list.
    pub fn names_mut(&self) -> RwLockWriteGuard<'_, NameList> {
        self.names.write()
    }

    /// Replace the list wholesale.
    pub fn replace_names(&self, names: NameList) {
        *self.names.write() = names;
    }

    /// Copy of the list.
    #[must_use]
    pub fn snapshot(&self) -> NameList {
        self.names.read().clone()
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    /// True when no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }

    /// Copy of the record covering `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<NameRecord> {
        self.names.read().lookup(name).cloned()
    }
}

impl RecordSource for NameRegistry {
    fn hot_key_binding(&self, identity: &SignerId) -> Option<HotKeyBinding> {
        self.hot_keys.read().get(identity).copied()
    }

    fn signed_lookup(&self, name: &str, hot_keys: &[[u8; PUBLIC_KEY_SIZE]]) -> Option<SignedLookup> {
        let keys = self.hot_keys.read();
        let names = self.names.read();
        let record = names.lookup(name)?;

        let slots = hot_keys
            .iter()
            .map(|raw| {
                Ed25519PublicKey::from_bytes(*raw)
                    .ok()
                    .and_then(|key| keys.identity_for_hot_key(&key))
                    .and_then(|id| record.signatures().get(&id).copied())
                    .unwrap_or(Ed25519Signature::ZERO)
            })
            .collect();

        Some(SignedLookup {
            binary: record.binary().to_vec(),
            slots,
        })
    }
}

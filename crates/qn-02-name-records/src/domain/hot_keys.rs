//! # Hot-Key Set
//!
//! Maps each signer identity to its current hot-key binding. The local
//! node's own binding is fixed at construction; peers' bindings arrive
//! through periodic key exchange.

use crate::domain::identity::{HotKeyBinding, SignerId};
use shared_crypto::Ed25519PublicKey;
use std::collections::HashMap;

/// Outcome of offering a binding to the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUpdate {
    /// First binding seen for this identity.
    Added,
    /// Same hot key as already held.
    Unchanged,
    /// Identity moved to a new hot key; its old signatures are stale.
    Rotated,
    /// A different key claimed for the local identity; ignored.
    RejectedSelf,
}

/// Identity to hot-key bindings known to this node.
#[derive(Debug, Clone)]
pub struct HotKeySet {
    local: SignerId,
    bindings: HashMap<SignerId, HotKeyBinding>,
}

impl HotKeySet {
    /// Create with the local node's own binding.
    #[must_use]
    pub fn new(local: SignerId, local_binding: HotKeyBinding) -> Self {
        let mut bindings = HashMap::new();
        bindings.insert(local, local_binding);
        Self { local, bindings }
    }

    /// Identity of this node.
    #[must_use]
    pub fn local_identity(&self) -> SignerId {
        self.local
    }

    /// Binding for `identity`.
    #[must_use]
    pub fn get(&self, identity: &SignerId) -> Option<&HotKeyBinding> {
        self.bindings.get(identity)
    }

    /// Hot key for `identity`.
    #[must_use]
    pub fn hot_key(&self, identity: &SignerId) -> Option<Ed25519PublicKey> {
        self.bindings.get(identity).map(|b| b.hot_key)
    }

    /// Identity currently bound to `hot_key`.
    #[must_use]
    pub fn identity_for_hot_key(&self, hot_key: &Ed25519PublicKey) -> Option<SignerId> {
        self.bindings
            .iter()
            .find(|(_, b)| b.hot_key == *hot_key)
            .map(|(id, _)| *id)
    }

    /// True if `identity` has a binding.
    #[must_use]
    pub fn contains(&self, identity: &SignerId) -> bool {
        self.bindings.contains_key(identity)
    }

    /// Number of known signers, local node included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Never true: the local binding is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// All bindings.
    pub fn iter(&self) -> impl Iterator<Item = (&SignerId, &HotKeyBinding)> {
        self.bindings.iter()
    }

    /// `(identity, hot key)` pairs sorted by identity, the order used when
    /// asking peers for signature slots.
    #[must_use]
    pub fn hot_keys_sorted(&self) -> Vec<(SignerId, Ed25519PublicKey)> {
        let mut out: Vec<_> = self
            .bindings
            .iter()
            .map(|(id, b)| (*id, b.hot_key))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Offer a binding. The caller has already verified it and must purge
    /// the identity's signatures on [`KeyUpdate::Rotated`], and those that
    /// fail under the new key on [`KeyUpdate::Added`].
    pub fn apply(&mut self, identity: SignerId, binding: HotKeyBinding) -> KeyUpdate {
        match self.bindings.get(&identity) {
            None => {
                self.bindings.insert(identity, binding);
                KeyUpdate::Added
            }
            Some(held) if held.hot_key == binding.hot_key => KeyUpdate::Unchanged,
            Some(_) if identity == self.local => KeyUpdate::RejectedSelf,
            Some(_) => {
                self.bindings.insert(identity, binding);
                KeyUpdate::Rotated
            }
        }
    }
}

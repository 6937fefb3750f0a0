//! # Name Authority
//!
//! A zone's authority publishes its signing keys as the history of one
//! ledger name. A name in the zone is authorized when its value carries an
//! `auth` signature from the key that was current when the name was first
//! registered.
//!
//! ```text
//! auth = hex(sign(authority key, [first_seen:u32 BE][full name UTF-8]))
//! ```

use shared_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use std::collections::BTreeMap;

/// Ledger name under which the authority for `domain` publishes keys.
///
/// `"nic.h"` becomes `"h/nic/"`.
#[must_use]
pub fn authority_name(domain: &str) -> String {
    let mut name = domain.split('.').rev().collect::<Vec<_>>().join("/");
    name.push('/');
    name
}

/// Bytes the authority signs for a name.
#[must_use]
pub fn auth_message(full_name: &str, first_seen: u32) -> Vec<u8> {
    let mut msg = Vec::with_capacity(4 + full_name.len());
    msg.extend_from_slice(&first_seen.to_be_bytes());
    msg.extend_from_slice(full_name.as_bytes());
    msg
}

/// Produce the hex `auth` field for a name.
#[must_use]
pub fn authorize(authority: &Ed25519KeyPair, full_name: &str, first_seen: u32) -> String {
    authority.sign(&auth_message(full_name, first_seen)).to_hex()
}

/// Authority signing keys by the ledger height they took effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityKeyMap {
    keys: BTreeMap<u32, Ed25519PublicKey>,
}

impl AuthorityKeyMap {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` took effect at `height`.
    pub fn insert(&mut self, height: u32, key: Ed25519PublicKey) {
        self.keys.insert(height, key);
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no keys are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The most recent key at or before `first_seen`.
    #[must_use]
    pub fn candidate(&self, first_seen: u32) -> Option<(u32, &Ed25519PublicKey)> {
        self.keys
            .range(..=first_seen)
            .next_back()
            .map(|(h, k)| (*h, k))
    }
}

impl FromIterator<(u32, Ed25519PublicKey)> for AuthorityKeyMap {
    fn from_iter<I: IntoIterator<Item = (u32, Ed25519PublicKey)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Check the `auth` member of `raw_value` for `full_name`.
#[must_use]
pub fn is_authorized(keys: &AuthorityKeyMap, full_name: &str, first_seen: u32, raw_value: &str) -> bool {
    let Some((_, key)) = keys.candidate(first_seen) else {
        return false;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw_value) else {
        return false;
    };
    let Some(auth) = value.get("auth").and_then(|a| a.as_str()) else {
        return false;
    };
    let Ok(sig) = Ed25519Signature::from_hex(auth) else {
        return false;
    };
    key.is_valid(&auth_message(full_name, first_seen), &sig)
}

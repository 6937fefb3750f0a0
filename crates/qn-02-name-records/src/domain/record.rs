//! # Name Record
//!
//! One ledger name as this node attests to it.
//!
//! ## Signable Content
//!
//! ```text
//! binary = [height:u32 BE] list(canonical name, canonical next name, value)
//! ```
//!
//! `value` is the ledger JSON with its `auth` member removed and keys
//! re-serialised in sorted order. Any change to `binary` drops every held
//! signature. Registration time (`first_seen`) is not part of it.
//!
//! ## Height
//!
//! The low byte of `height` is a per-name salt (first byte of
//! SHA-512 of the canonical name), the rest is the ledger height rounded
//! down to a multiple of 256. Records therefore go stale, and get
//! re-signed, once every 256 ledger blocks, staggered by name.

use crate::domain::comparator::{canonical_name, compare_names};
use crate::domain::errors::RecordError;
use crate::domain::identity::SignerId;
use qn_01_wire_codec::{encoded_list_len, read_str_list, write_str_list, WireBuffer, MAX_STRING_LEN};
use shared_crypto::{sha512, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use std::cmp::Ordering;

/// Bits of `height` taken by the per-name salt.
pub const HEIGHT_SALT_MASK: u32 = 0x0000_00FF;

/// Stable salt for a canonical name.
#[must_use]
pub fn name_salt(canonical: &str) -> u8 {
    sha512(canonical.as_bytes())[0]
}

/// Combine a ledger height with a name salt.
#[must_use]
pub fn compose_height(ledger_height: u32, salt: u8) -> u32 {
    (ledger_height & !HEIGHT_SALT_MASK) | u32::from(salt)
}

/// Re-serialise a ledger value without its `auth` member.
pub fn canonical_value(raw: &str) -> Result<String, RecordError> {
    let mut value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| RecordError::InvalidValue(e.to_string()))?;
    value
        .as_object_mut()
        .ok_or_else(|| RecordError::InvalidValue("value is not a JSON object".to_string()))?
        .remove("auth");
    serde_json::to_string(&value).map_err(|e| RecordError::InvalidValue(e.to_string()))
}

fn check_len(field: &'static str, s: &str) -> Result<(), RecordError> {
    if s.len() > MAX_STRING_LEN {
        return Err(RecordError::FieldTooLong {
            field,
            len: s.len(),
        });
    }
    Ok(())
}

// =============================================================================
// SIGNABLE CONTENT
// =============================================================================

/// The fields covered by record signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignableContent {
    /// Salted freshness tag.
    pub height: u32,
    /// Canonical name.
    pub name: String,
    /// Canonical name of the successor.
    pub next_name: String,
    /// Value JSON without `auth`.
    pub value: String,
}

impl SignableContent {
    /// Serialise to the signed byte form.
    pub fn encode(&self) -> Result<Vec<u8>, RecordError> {
        let fields = [
            self.name.as_bytes(),
            self.next_name.as_bytes(),
            self.value.as_bytes(),
        ];
        let mut buf = WireBuffer::with_capacity(4 + encoded_list_len(&fields));
        write_str_list(&mut buf, &fields)?;
        buf.push32(self.height);
        Ok(buf.into_vec())
    }

    /// Consume signable content from the front of `buf`.
    pub fn decode(buf: &mut WireBuffer) -> Result<Self, RecordError> {
        let height = buf.pop32()?;
        let fields = read_str_list(buf)?;
        let [name, next_name, value]: [Vec<u8>; 3] = fields.try_into().map_err(|f: Vec<_>| {
            RecordError::MalformedContent(format!("expected 3 fields, got {}", f.len()))
        })?;
        let utf8 = |b: Vec<u8>| {
            String::from_utf8(b).map_err(|e| RecordError::MalformedContent(e.to_string()))
        };
        Ok(Self {
            height,
            name: utf8(name)?,
            next_name: utf8(next_name)?,
            value: utf8(value)?,
        })
    }

    /// True when this record answers a lookup of the canonical name
    /// `query`: the names match, or `query` falls in the ring range
    /// `[name, next_name)`. A record linking to itself covers every name.
    #[must_use]
    pub fn covers(&self, query: &str) -> bool {
        if self.name == query {
            return true;
        }
        let start = format!("{}/", self.name);
        let end = format!("{}/", self.next_name);
        let query = format!("{}/", query);
        let after_start = compare_names(&query, &start) != Ordering::Less;
        let before_end = compare_names(&query, &end) == Ordering::Less;
        if compare_names(&start, &end) == Ordering::Less {
            after_start && before_end
        } else {
            after_start || before_end
        }
    }
}

// =============================================================================
// SIGNATURE SET
// =============================================================================

/// Signatures over a record, one per signer, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureSet {
    entries: Vec<(SignerId, Ed25519Signature)>,
}

impl SignatureSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of signers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nobody has signed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Signature held for `id`.
    #[must_use]
    pub fn get(&self, id: &SignerId) -> Option<&Ed25519Signature> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, s)| s)
    }

    /// True when `id` has signed.
    #[must_use]
    pub fn contains(&self, id: &SignerId) -> bool {
        self.get(id).is_some()
    }

    /// Insert or replace the signature for `id`, keeping its position.
    pub fn insert(&mut self, id: SignerId, sig: Ed25519Signature) {
        match self.entries.iter_mut().find(|(k, _)| *k == id) {
            Some(entry) => entry.1 = sig,
            None => self.entries.push((id, sig)),
        }
    }

    /// Remove the signature for `id`.
    pub fn remove(&mut self, id: &SignerId) -> Option<Ed25519Signature> {
        let idx = self.entries.iter().position(|(k, _)| k == id)?;
        Some(self.entries.remove(idx).1)
    }

    /// Keep only signers for which `keep` returns true.
    pub fn retain<F: FnMut(&SignerId) -> bool>(&mut self, mut keep: F) {
        self.entries.retain(|(k, _)| keep(k));
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Signers and signatures in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(SignerId, Ed25519Signature)> {
        self.entries.iter()
    }
}

impl FromIterator<(SignerId, Ed25519Signature)> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = (SignerId, Ed25519Signature)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (id, sig) in iter {
            set.insert(id, sig);
        }
        set
    }
}

// =============================================================================
// NAME RECORD
// =============================================================================

/// A ledger name with its signable form and collected signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    full_name: String,
    next_full_name: String,
    raw_value: String,
    first_seen: u32,
    salt: u8,
    content: SignableContent,
    binary: Vec<u8>,
    signatures: SignatureSet,
}

impl NameRecord {
    /// Build an unsigned record at ledger height 0.
    pub fn new(
        full_name: &str,
        next_full_name: &str,
        raw_value: &str,
        first_seen: u32,
    ) -> Result<Self, RecordError> {
        check_len("name", full_name)?;
        check_len("next_name", next_full_name)?;
        check_len("value", raw_value)?;

        let name = canonical_name(full_name).to_string();
        let salt = name_salt(&name);
        let content = SignableContent {
            height: compose_height(0, salt),
            name,
            next_name: canonical_name(next_full_name).to_string(),
            value: canonical_value(raw_value)?,
        };
        let binary = content.encode()?;

        Ok(Self {
            full_name: full_name.to_string(),
            next_full_name: next_full_name.to_string(),
            raw_value: raw_value.to_string(),
            first_seen,
            salt,
            content,
            binary,
            signatures: SignatureSet::new(),
        })
    }

    /// Rebuild a persisted record with its stored height and signatures.
    pub fn restore(
        full_name: &str,
        next_full_name: &str,
        raw_value: &str,
        height: u32,
        signatures: SignatureSet,
    ) -> Result<Self, RecordError> {
        let mut record = Self::new(full_name, next_full_name, raw_value, 0)?;
        record.content.height = compose_height(height, record.salt);
        record.binary = record.content.encode()?;
        record.signatures = signatures;
        Ok(record)
    }

    /// Ledger name, alias suffix included.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Canonical name (the list key).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.content.name
    }

    /// Ledger name of the successor.
    #[must_use]
    pub fn next_full_name(&self) -> &str {
        &self.next_full_name
    }

    /// Canonical name of the successor.
    #[must_use]
    pub fn next_name(&self) -> &str {
        &self.content.next_name
    }

    /// Ledger value as received, `auth` included.
    #[must_use]
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    /// Signed value JSON.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.content.value
    }

    /// Registration height on the ledger.
    #[must_use]
    pub fn first_seen(&self) -> u32 {
        self.first_seen
    }

    /// Salted freshness tag.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.content.height
    }

    /// Fields covered by signatures.
    #[must_use]
    pub fn content(&self) -> &SignableContent {
        &self.content
    }

    /// Signed byte form.
    #[must_use]
    pub fn binary(&self) -> &[u8] {
        &self.binary
    }

    /// Collected signatures.
    #[must_use]
    pub fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Swap in new content; drops signatures if the signed bytes change.
    fn apply(&mut self, content: SignableContent) -> Result<bool, RecordError> {
        let binary = content.encode()?;
        self.content = content;
        if binary == self.binary {
            return Ok(false);
        }
        self.binary = binary;
        self.signatures.clear();
        Ok(true)
    }

    /// Update registration height. Never touches signed content.
    pub fn set_first_seen(&mut self, first_seen: u32) {
        self.first_seen = first_seen;
    }

    /// Update the value. Returns true if signatures were dropped.
    pub fn set_value(&mut self, raw_value: &str) -> Result<bool, RecordError> {
        if raw_value == self.raw_value {
            return Ok(false);
        }
        check_len("value", raw_value)?;
        let content = SignableContent {
            value: canonical_value(raw_value)?,
            ..self.content.clone()
        };
        let dirtied = self.apply(content)?;
        self.raw_value = raw_value.to_string();
        Ok(dirtied)
    }

    /// Update the successor. Returns true if signatures were dropped.
    pub fn set_next_full_name(&mut self, next_full_name: &str) -> Result<bool, RecordError> {
        if next_full_name == self.next_full_name {
            return Ok(false);
        }
        check_len("next_name", next_full_name)?;
        let content = SignableContent {
            next_name: canonical_name(next_full_name).to_string(),
            ..self.content.clone()
        };
        let dirtied = self.apply(content)?;
        self.next_full_name = next_full_name.to_string();
        Ok(dirtied)
    }

    /// Switch to another ledger name, normally an alias of the same
    /// canonical name. Returns true if signatures were dropped.
    pub fn set_full_name(&mut self, full_name: &str) -> Result<bool, RecordError> {
        if full_name == self.full_name {
            return Ok(false);
        }
        check_len("name", full_name)?;
        let name = canonical_name(full_name).to_string();
        let salt = name_salt(&name);
        let content = SignableContent {
            height: compose_height(self.content.height, salt),
            name,
            ..self.content.clone()
        };
        let dirtied = self.apply(content)?;
        self.salt = salt;
        self.full_name = full_name.to_string();
        Ok(dirtied)
    }

    /// Fold in the current ledger height. Only a change of the rounded
    /// high bits alters the record. Returns true if signatures were dropped.
    pub fn set_height(&mut self, ledger_height: u32) -> Result<bool, RecordError> {
        let height = compose_height(ledger_height, self.salt);
        if height == self.content.height {
            return Ok(false);
        }
        let content = SignableContent {
            height,
            ..self.content.clone()
        };
        self.apply(content)
    }

    // -------------------------------------------------------------------------
    // Signatures
    // -------------------------------------------------------------------------

    /// Sign the current binary as `identity` using its hot key.
    pub fn sign(&mut self, identity: SignerId, hot_key: &Ed25519KeyPair) {
        let sig = hot_key.sign(&self.binary);
        self.signatures.insert(identity, sig);
    }

    /// Record a signature obtained elsewhere.
    pub fn add_signature(&mut self, identity: SignerId, sig: Ed25519Signature) {
        self.signatures.insert(identity, sig);
    }

    /// Drop the signature of `identity`. Returns true if one was held.
    pub fn purge_signer(&mut self, identity: &SignerId) -> bool {
        self.signatures.remove(identity).is_some()
    }

    /// Keep only signatures from signers accepted by `keep`.
    pub fn retain_signers<F: FnMut(&SignerId) -> bool>(&mut self, keep: F) {
        self.signatures.retain(keep);
    }

    /// Check `sig` against the current binary under `hot_key`.
    #[must_use]
    pub fn verify_signature(&self, sig: &Ed25519Signature, hot_key: &Ed25519PublicKey) -> bool {
        hot_key.is_valid(&self.binary, sig)
    }
}

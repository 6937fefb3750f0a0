//! Signer identities and hot-key bindings.

use shared_crypto::{CryptoError, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use std::fmt;

/// Stable identity of a signer: the raw bytes of its long-term cold key.
///
/// Stored unvalidated so that unknown or malformed keys arriving off the
/// wire can still be used as map keys; [`SignerId::public_key`] validates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignerId([u8; 32]);

impl SignerId {
    /// Wrap raw key bytes.
    #[must_use]
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Interpret as an Ed25519 cold key.
    pub fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError> {
        Ed25519PublicKey::from_bytes(self.0)
    }
}

impl From<Ed25519PublicKey> for SignerId {
    fn from(key: Ed25519PublicKey) -> Self {
        Self(*key.as_bytes())
    }
}

impl fmt::Display for SignerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for SignerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignerId({})", &hex::encode(&self.0[..8]))
    }
}

/// A hot key plus the cold-key signature over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotKeyBinding {
    /// Operational signing key.
    pub hot_key: Ed25519PublicKey,
    /// Cold key's signature over `hot_key`.
    pub proof: Ed25519Signature,
}

impl HotKeyBinding {
    /// Bind `hot_key` to the identity of `cold`.
    #[must_use]
    pub fn create(cold: &Ed25519KeyPair, hot_key: Ed25519PublicKey) -> Self {
        Self {
            hot_key,
            proof: cold.sign(hot_key.as_bytes()),
        }
    }

    /// Check that `identity` signed this hot key.
    pub fn verify(&self, identity: &SignerId) -> Result<(), CryptoError> {
        identity
            .public_key()?
            .verify(self.hot_key.as_bytes(), &self.proof)
    }
}

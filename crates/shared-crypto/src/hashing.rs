//! # SHA-512 Hashing
//!
//! Used for the snapshot integrity digest and the per-name height salt.

use sha2::{Digest, Sha512};

/// SHA-512 digest output (512-bit).
pub type Sha512Digest = [u8; 64];

/// Stateful SHA-512 hasher.
pub struct Sha512Hasher {
    inner: Sha512,
}

impl Sha512Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            inner: Sha512::new(),
        }
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(self) -> Sha512Digest {
        let mut out = [0u8; 64];
        out.copy_from_slice(&self.inner.finalize());
        out
    }
}

impl Default for Sha512Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with SHA-512 (one-shot).
pub fn sha512(data: &[u8]) -> Sha512Digest {
    let mut out = [0u8; 64];
    out.copy_from_slice(&Sha512::digest(data));
    out
}

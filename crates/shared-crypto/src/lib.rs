//! # Shared Crypto - Signature and Hashing Primitives
//!
//! The sign/verify capability every other crate treats as a black box.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | Record signatures, hot-key bindings, authority proofs |
//! | `hashing` | SHA-512 | Snapshot integrity, per-name height salt |
//!
//! ## Sizes
//!
//! - Public keys are 32 bytes, signatures 64 bytes, digests 64 bytes.
//! - All wire and storage formats depend on these widths.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{sha512, Sha512Digest, Sha512Hasher};
pub use signatures::{
    Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, PUBLIC_KEY_SIZE, SIGNATURE_SIZE,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}

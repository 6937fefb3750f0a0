//! Key generation and loading of the local signing identity.

use crate::config::SignerKeys;
use qn_02_name_records::{HotKeyBinding, SignerId};
use qn_04_name_sync::LocalSigner;
use shared_crypto::{CryptoError, Ed25519KeyPair};
use std::fmt;
use thiserror::Error;

/// Key handling errors.
#[derive(Debug, Error)]
pub enum KeyError {
    /// A secret could not be decoded.
    #[error("Invalid secret key: {0}")]
    BadSecret(#[from] CryptoError),

    /// The proof does not bind the hot key to the cold key.
    #[error("Hot key is not bound to identity {0}")]
    BadBinding(SignerId),
}

/// A fresh cold keypair, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColdKeyOutput {
    /// Secret seed; keep offline.
    pub secret: String,
    /// Public key, the signer identity.
    pub public: String,
}

impl fmt::Display for ColdKeyOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cold_secret = \"{}\"", self.secret)?;
        write!(f, "cold_public = \"{}\"", self.public)
    }
}

/// A fresh hot keypair and its binding, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotKeyOutput {
    /// Cold public key the hot key is bound to.
    pub cold_public: String,
    /// Hot secret seed.
    pub hot_secret: String,
    /// Hot public key.
    pub hot_public: String,
    /// Cold signature over the hot public key.
    pub hot_proof: String,
}

impl fmt::Display for HotKeyOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[identity]")?;
        writeln!(f, "cold_public = \"{}\"", self.cold_public)?;
        writeln!(f, "hot_secret = \"{}\"", self.hot_secret)?;
        writeln!(f, "hot_proof = \"{}\"", self.hot_proof)?;
        write!(f, "# hot_public = \"{}\"", self.hot_public)
    }
}

/// Generate a cold keypair.
#[must_use]
pub fn generate_cold() -> ColdKeyOutput {
    let cold = Ed25519KeyPair::generate();
    ColdKeyOutput {
        secret: hex::encode(cold.to_seed()),
        public: cold.public_key().to_hex(),
    }
}

/// Generate a hot keypair and sign it with the cold secret.
pub fn generate_hot(cold_secret_hex: &str) -> Result<HotKeyOutput, KeyError> {
    let cold = Ed25519KeyPair::from_hex_seed(cold_secret_hex)?;
    let hot = Ed25519KeyPair::generate();
    let binding = HotKeyBinding::create(&cold, hot.public_key());
    Ok(HotKeyOutput {
        cold_public: cold.public_key().to_hex(),
        hot_secret: hex::encode(hot.to_seed()),
        hot_public: binding.hot_key.to_hex(),
        hot_proof: binding.proof.to_hex(),
    })
}

/// Build the local signer from configured keys, checking the binding.
pub fn load_signer(keys: &SignerKeys) -> Result<LocalSigner, KeyError> {
    let hot = Ed25519KeyPair::from_hex_seed(&keys.hot_secret)?;
    let binding = HotKeyBinding {
        hot_key: hot.public_key(),
        proof: keys.hot_proof,
    };
    binding
        .verify(&keys.cold_public)
        .map_err(|_| KeyError::BadBinding(keys.cold_public))?;
    Ok(LocalSigner::new(keys.cold_public, hot, binding))
}

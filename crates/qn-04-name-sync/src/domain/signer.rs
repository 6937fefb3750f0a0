//! This node's signing identity.

use qn_02_name_records::{HotKeyBinding, HotKeySet, NameRecord, SignerId};
use shared_crypto::Ed25519KeyPair;

/// Cold identity plus the hot key it signs records with.
pub struct LocalSigner {
    identity: SignerId,
    hot_key: Ed25519KeyPair,
    binding: HotKeyBinding,
}

impl LocalSigner {
    /// Signer for `identity`; `binding` must bind `hot_key` to it.
    #[must_use]
    pub fn new(identity: SignerId, hot_key: Ed25519KeyPair, binding: HotKeyBinding) -> Self {
        Self {
            identity,
            hot_key,
            binding,
        }
    }

    /// Signer identity (cold public key).
    #[must_use]
    pub fn identity(&self) -> SignerId {
        self.identity
    }

    /// Binding proof for our hot key.
    #[must_use]
    pub fn binding(&self) -> HotKeyBinding {
        self.binding
    }

    /// A key set holding only our own binding.
    #[must_use]
    pub fn initial_key_set(&self) -> HotKeySet {
        HotKeySet::new(self.identity, self.binding)
    }

    /// Sign `record` unless we already have. Signatures from identities
    /// absent from `keys` are dropped first. Returns true if it signed.
    pub fn sign(&self, record: &mut NameRecord, keys: &HotKeySet) -> bool {
        if record.signatures().contains(&self.identity) {
            return false;
        }
        record.retain_signers(|id| keys.contains(id));
        record.sign(self.identity, &self.hot_key);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> LocalSigner {
        let cold = Ed25519KeyPair::generate();
        let hot = Ed25519KeyPair::generate();
        let binding = HotKeyBinding::create(&cold, hot.public_key());
        LocalSigner::new(SignerId::from(cold.public_key()), hot, binding)
    }

    #[test]
    fn test_signs_once() {
        let signer = signer();
        let keys = signer.initial_key_set();
        let mut record = NameRecord::new("h/a/", "h/a/", "{}", 1).unwrap();

        assert!(signer.sign(&mut record, &keys));
        assert!(!signer.sign(&mut record, &keys));
        assert_eq!(record.signatures().len(), 1);

        let sig = record.signatures().get(&signer.identity()).unwrap();
        assert!(record.verify_signature(sig, &signer.binding().hot_key));
    }

    #[test]
    fn test_unknown_signers_dropped() {
        let signer = signer();
        let keys = signer.initial_key_set();
        let mut record = NameRecord::new("h/a/", "h/a/", "{}", 1).unwrap();
        let stranger = Ed25519KeyPair::generate();
        record.sign(SignerId::new([7; 32]), &stranger);

        assert!(signer.sign(&mut record, &keys));
        assert_eq!(record.signatures().len(), 1);
        assert!(record.signatures().contains(&signer.identity()));
    }
}

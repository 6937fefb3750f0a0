//! # Operation Codecs
//!
//! Payload encoders and decoders for the hot-keys and lookup operations.
//! Headers are handled by the transport and dispatcher; everything here
//! works on the bytes after the header.
//!
//! Encoders prepend, so fields are pushed back to front.

use crate::domain::errors::ProtocolError;
use qn_01_wire_codec::{read_str_list, write_str_list, WireBuffer};
use qn_02_name_records::{HotKeyBinding, SignableContent, SignatureSet, SignerId};
use shared_crypto::{Ed25519PublicKey, Ed25519Signature, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};
use tracing::debug;

/// Keys per request; the hot-keys manifest is a 32-bit field.
pub const MAX_KEYS_PER_REQUEST: usize = 32;

/// One `(proof, hot key)` entry in a hot-keys reply.
const BINDING_ENTRY_LEN: usize = SIGNATURE_SIZE + PUBLIC_KEY_SIZE;

fn key_count(block_len: usize) -> Result<usize, ProtocolError> {
    if block_len % PUBLIC_KEY_SIZE != 0 {
        return Err(ProtocolError::MisalignedKeys(block_len));
    }
    let count = block_len / PUBLIC_KEY_SIZE;
    if count > MAX_KEYS_PER_REQUEST {
        return Err(ProtocolError::TooManyKeys(count));
    }
    Ok(count)
}

// =============================================================================
// HOT KEYS (op 1)
// =============================================================================

/// Request payload: the cold keys, concatenated.
pub fn encode_hot_keys_request(cold_keys: &[SignerId]) -> Result<WireBuffer, ProtocolError> {
    if cold_keys.len() > MAX_KEYS_PER_REQUEST {
        return Err(ProtocolError::TooManyKeys(cold_keys.len()));
    }
    let mut buf = WireBuffer::with_capacity(cold_keys.len() * PUBLIC_KEY_SIZE);
    for key in cold_keys.iter().rev() {
        buf.push(key.as_bytes());
    }
    Ok(buf)
}

/// Parse the cold keys out of a request payload.
pub fn decode_hot_keys_request(mut buf: WireBuffer) -> Result<Vec<SignerId>, ProtocolError> {
    let count = key_count(buf.size())?;
    (0..count)
        .map(|_| Ok(SignerId::new(buf.pop_array()?)))
        .collect()
}

/// Build a reply: bit `i` of the manifest is set when a binding for
/// `requested[i]` follows. Entries stop once the payload would exceed
/// `budget` bytes; their bits stay clear.
pub fn encode_hot_keys_reply<F>(requested: &[SignerId], budget: usize, binding_for: F) -> WireBuffer
where
    F: Fn(&SignerId) -> Option<HotKeyBinding>,
{
    let mut manifest = 0u32;
    let mut included = Vec::new();
    let mut size = 4;
    for (i, id) in requested.iter().enumerate().take(MAX_KEYS_PER_REQUEST) {
        let Some(binding) = binding_for(id) else {
            continue;
        };
        if size + BINDING_ENTRY_LEN > budget {
            break;
        }
        size += BINDING_ENTRY_LEN;
        manifest |= 1 << i;
        included.push(binding);
    }

    let mut buf = WireBuffer::with_capacity(size);
    for binding in included.iter().rev() {
        buf.push(binding.hot_key.as_bytes());
        buf.push(binding.proof.as_bytes());
    }
    buf.push32(manifest);
    buf
}

/// Parse a reply to a request for `requested`. Every returned binding
/// has been checked against the cold key it was requested for.
pub fn decode_hot_keys_reply(
    mut buf: WireBuffer,
    requested: &[SignerId],
) -> Result<Vec<(SignerId, HotKeyBinding)>, ProtocolError> {
    let manifest = buf.pop32()?;
    let requested = &requested[..requested.len().min(MAX_KEYS_PER_REQUEST)];
    let allowed = if requested.len() == MAX_KEYS_PER_REQUEST {
        u32::MAX
    } else {
        (1u32 << requested.len()) - 1
    };
    if manifest & !allowed != 0 {
        return Err(ProtocolError::InvalidManifest {
            manifest,
            requested: requested.len(),
        });
    }

    let mut out = Vec::with_capacity(manifest.count_ones() as usize);
    for (i, id) in requested.iter().enumerate() {
        if manifest & (1 << i) == 0 {
            continue;
        }
        let proof = Ed25519Signature::from_bytes(buf.pop_array()?);
        let hot_key = Ed25519PublicKey::from_bytes(buf.pop_array()?)
            .map_err(|_| ProtocolError::InvalidHotKey(*id))?;
        let binding = HotKeyBinding { hot_key, proof };
        binding
            .verify(id)
            .map_err(|_| ProtocolError::BadBinding(*id))?;
        out.push((*id, binding));
    }
    Ok(out)
}

// =============================================================================
// LOOKUP (op 2)
// =============================================================================

/// Request payload: a one-item list holding the name, then the hot keys
/// whose signature slots the caller wants, in slot order.
pub fn encode_lookup_request(
    name: &str,
    hot_keys: &[Ed25519PublicKey],
) -> Result<WireBuffer, ProtocolError> {
    if hot_keys.len() > MAX_KEYS_PER_REQUEST {
        return Err(ProtocolError::TooManyKeys(hot_keys.len()));
    }
    let mut buf = WireBuffer::new();
    for key in hot_keys.iter().rev() {
        buf.push(key.as_bytes());
    }
    write_str_list(&mut buf, &[name])?;
    Ok(buf)
}

/// Parse a lookup request into the name and raw hot-key bytes.
pub fn decode_lookup_request(
    mut buf: WireBuffer,
) -> Result<(String, Vec<[u8; PUBLIC_KEY_SIZE]>), ProtocolError> {
    let list = read_str_list(&mut buf)?;
    let [name]: [Vec<u8>; 1] = list
        .try_into()
        .map_err(|l: Vec<_>| ProtocolError::BadNameList(l.len()))?;
    let name = String::from_utf8(name).map_err(|_| ProtocolError::InvalidName)?;

    let count = key_count(buf.size())?;
    let keys = (0..count)
        .map(|_| buf.pop_array())
        .collect::<Result<Vec<_>, _>>()?;
    Ok((name, keys))
}

/// Build a reply: the signed bytes, then one 64-byte slot per requested
/// key. Slots that would push the payload past `budget` are dropped.
pub fn encode_lookup_reply(binary: &[u8], slots: &[Ed25519Signature], budget: usize) -> WireBuffer {
    let room = budget.saturating_sub(binary.len()) / SIGNATURE_SIZE;
    let kept = &slots[..slots.len().min(room)];
    if kept.len() < slots.len() {
        debug!(
            requested = slots.len(),
            kept = kept.len(),
            "Truncated signature slots to fit datagram"
        );
    }

    let mut buf = WireBuffer::with_capacity(binary.len() + kept.len() * SIGNATURE_SIZE);
    for sig in kept.iter().rev() {
        buf.push(sig.as_bytes());
    }
    buf.push(binary);
    buf
}

/// A decoded lookup reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupReply {
    /// The signed fields.
    pub content: SignableContent,
    /// Canonical signed bytes of `content`.
    pub binary: Vec<u8>,
    /// Signatures that verified, keyed by signer identity.
    pub signatures: SignatureSet,
    /// Identities whose slot held a signature that did not verify.
    pub rejected: Vec<SignerId>,
}

/// Parse a reply to a lookup sent with `hot_keys` in slot order.
///
/// Zero slots are skipped. A slot list shorter than the request is fine;
/// a partial slot is an error. Each non-zero slot is checked against the
/// hot key of the identity in the same position.
pub fn decode_lookup_reply(
    mut buf: WireBuffer,
    hot_keys: &[(SignerId, Ed25519PublicKey)],
) -> Result<LookupReply, ProtocolError> {
    let content = SignableContent::decode(&mut buf)?;
    let binary = content.encode()?;

    let mut signatures = SignatureSet::new();
    let mut rejected = Vec::new();
    for (id, hot_key) in hot_keys {
        if buf.is_empty() {
            break;
        }
        let sig = Ed25519Signature::from_bytes(buf.pop_array()?);
        if sig.is_zero() {
            continue;
        }
        if hot_key.is_valid(&binary, &sig) {
            signatures.insert(*id, sig);
        } else {
            debug!(signer = %id, name = %content.name, "Rejected invalid signature slot");
            rejected.push(*id);
        }
    }

    Ok(LookupReply {
        content,
        binary,
        signatures,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qn_01_wire_codec::WireError;
    use shared_crypto::Ed25519KeyPair;

    struct Signer {
        id: SignerId,
        cold: Ed25519KeyPair,
        hot: Ed25519KeyPair,
    }

    impl Signer {
        fn new() -> Self {
            let cold = Ed25519KeyPair::generate();
            Self {
                id: SignerId::from(cold.public_key()),
                cold,
                hot: Ed25519KeyPair::generate(),
            }
        }

        fn binding(&self) -> HotKeyBinding {
            HotKeyBinding::create(&self.cold, self.hot.public_key())
        }
    }

    fn content() -> SignableContent {
        SignableContent {
            height: 0x1234_5600,
            name: "h/alice".into(),
            next_name: "h/bob".into(),
            value: r#"{"ip6":"fc00::1"}"#.into(),
        }
    }

    #[test]
    fn test_hot_keys_request_roundtrip() {
        let ids: Vec<_> = (0..3).map(|i| SignerId::new([i; 32])).collect();
        let buf = encode_hot_keys_request(&ids).unwrap();
        assert_eq!(buf.size(), 96);
        assert_eq!(decode_hot_keys_request(buf).unwrap(), ids);
    }

    #[test]
    fn test_hot_keys_request_must_be_key_aligned() {
        let buf = WireBuffer::from_slice(&[0u8; 33]);
        assert_eq!(
            decode_hot_keys_request(buf),
            Err(ProtocolError::MisalignedKeys(33))
        );
        let too_many = vec![SignerId::new([0; 32]); 33];
        assert_eq!(
            encode_hot_keys_request(&too_many).err(),
            Some(ProtocolError::TooManyKeys(33))
        );
    }

    #[test]
    fn test_hot_keys_reply_marks_known_keys() {
        let a = Signer::new();
        let b = Signer::new();
        let unknown = SignerId::new([9; 32]);
        let requested = [a.id, unknown, b.id];

        let reply = encode_hot_keys_reply(&requested, 1020, |id| {
            [&a, &b].iter().find(|s| s.id == *id).map(|s| s.binding())
        });
        assert_eq!(reply.as_slice()[..4], 0b101u32.to_be_bytes());

        let bindings = decode_hot_keys_reply(reply, &requested).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].0, a.id);
        assert_eq!(bindings[0].1.hot_key, a.hot.public_key());
        assert_eq!(bindings[1].0, b.id);
    }

    #[test]
    fn test_hot_keys_reply_respects_budget() {
        let signers: Vec<_> = (0..12).map(|_| Signer::new()).collect();
        let requested: Vec<_> = signers.iter().map(|s| s.id).collect();
        let reply = encode_hot_keys_reply(&requested, 1020, |id| {
            signers.iter().find(|s| s.id == *id).map(|s| s.binding())
        });
        // (1020 - 4) / 96 = 10 entries fit
        assert!(reply.size() <= 1020);
        let bindings = decode_hot_keys_reply(reply, &requested).unwrap();
        assert_eq!(bindings.len(), 10);
    }

    #[test]
    fn test_hot_keys_reply_manifest_without_data() {
        let requested: Vec<_> = (0..3).map(|i| SignerId::new([i; 32])).collect();
        let buf = WireBuffer::from_slice(&0b100u32.to_be_bytes());
        assert!(matches!(
            decode_hot_keys_reply(buf, &requested),
            Err(ProtocolError::Wire(WireError::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_hot_keys_reply_manifest_beyond_request() {
        let requested = [SignerId::new([1; 32])];
        let buf = WireBuffer::from_slice(&0b10u32.to_be_bytes());
        assert!(matches!(
            decode_hot_keys_reply(buf, &requested),
            Err(ProtocolError::InvalidManifest { manifest: 2, requested: 1 })
        ));
    }

    #[test]
    fn test_hot_keys_reply_forged_binding_rejected() {
        let a = Signer::new();
        let mallory = Signer::new();
        // mallory's binding offered under a's identity
        let reply = encode_hot_keys_reply(&[a.id], 1020, |_| Some(mallory.binding()));
        assert_eq!(
            decode_hot_keys_reply(reply, &[a.id]),
            Err(ProtocolError::BadBinding(a.id))
        );
    }

    #[test]
    fn test_lookup_request_roundtrip() {
        let keys: Vec<_> = (0..2).map(|_| Ed25519KeyPair::generate().public_key()).collect();
        let buf = encode_lookup_request("h/alice", &keys).unwrap();
        let (name, raw) = decode_lookup_request(buf).unwrap();
        assert_eq!(name, "h/alice");
        assert_eq!(raw.len(), 2);
        assert_eq!(&raw[1], keys[1].as_bytes());
    }

    #[test]
    fn test_lookup_request_needs_one_name() {
        let mut buf = WireBuffer::new();
        write_str_list(&mut buf, &["h/a", "h/b"]).unwrap();
        assert_eq!(
            decode_lookup_request(buf),
            Err(ProtocolError::BadNameList(2))
        );

        let mut buf = WireBuffer::new();
        buf.push(&[7u8; 10]);
        write_str_list(&mut buf, &["h/a"]).unwrap();
        assert_eq!(
            decode_lookup_request(buf),
            Err(ProtocolError::MisalignedKeys(10))
        );
    }

    #[test]
    fn test_lookup_reply_sorts_valid_and_invalid() {
        let a = Signer::new();
        let b = Signer::new();
        let c = Signer::new();
        let binary = content().encode().unwrap();

        let slots = [
            a.hot.sign(&binary),
            Ed25519Signature::ZERO,
            // c's slot signed by the wrong key
            b.hot.sign(&binary),
        ];
        let buf = encode_lookup_reply(&binary, &slots, 1020);
        let keys = [
            (a.id, a.hot.public_key()),
            (b.id, b.hot.public_key()),
            (c.id, c.hot.public_key()),
        ];

        let reply = decode_lookup_reply(buf, &keys).unwrap();
        assert_eq!(reply.content, content());
        assert_eq!(reply.binary, binary);
        assert_eq!(reply.signatures.len(), 1);
        assert!(reply.signatures.contains(&a.id));
        assert_eq!(reply.rejected, vec![c.id]);
    }

    #[test]
    fn test_lookup_reply_truncated_to_budget() {
        let binary = content().encode().unwrap();
        let hot = Ed25519KeyPair::generate();
        let slots = vec![hot.sign(&binary); 20];

        let buf = encode_lookup_reply(&binary, &slots, 1020);
        assert!(buf.size() <= 1020);
        let kept = (buf.size() - binary.len()) / SIGNATURE_SIZE;
        assert_eq!(kept, (1020 - binary.len()) / SIGNATURE_SIZE);

        // short slot list decodes fine
        let id = SignerId::from(hot.public_key());
        let keys = vec![(id, hot.public_key()); 20];
        let reply = decode_lookup_reply(buf, &keys).unwrap();
        assert_eq!(reply.signatures.len(), 1);
    }

    #[test]
    fn test_lookup_reply_partial_slot_is_error() {
        let binary = content().encode().unwrap();
        let mut buf = WireBuffer::from_slice(&[1u8; 10]);
        buf.push(&binary);
        let keys = [(SignerId::new([1; 32]), Ed25519KeyPair::generate().public_key())];
        assert!(matches!(
            decode_lookup_reply(buf, &keys),
            Err(ProtocolError::Wire(WireError::OutOfBounds { .. }))
        ));
    }
}

//! # Quorum Client
//!
//! [`QuorumClient`] speaks the three operations to one peer at a time.
//! [`QuorumResolver`] builds a verified name lookup on top of it: fetch
//! hot keys for the trusted cold keys, ask for the record with a slot per
//! hot key, accept only with at least `min_signatures` valid signatures.

use crate::domain::errors::{ResolveError, RpcError};
use crate::domain::protocol::{
    decode_hot_keys_reply, decode_lookup_reply, encode_hot_keys_request, encode_lookup_request,
    LookupReply, MAX_KEYS_PER_REQUEST,
};
use crate::ports::inbound::QuorumExchange;
use crate::ports::outbound::RpcTransport;
use async_trait::async_trait;
use qn_01_wire_codec::{OpCode, WireBuffer};
use qn_02_name_records::{HotKeyBinding, SignableContent, SignatureSet, SignerId};
use rand::Rng;
use shared_crypto::Ed25519PublicKey;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Protocol client over any [`RpcTransport`].
pub struct QuorumClient<T: RpcTransport> {
    transport: Arc<T>,
}

impl<T: RpcTransport> Clone for QuorumClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: RpcTransport> QuorumClient<T> {
    /// Client sending through `transport`.
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Echo `payload` off `target`.
    pub async fn ping(&self, payload: &[u8], target: SocketAddr) -> Result<Vec<u8>, RpcError> {
        let reply = self
            .transport
            .request(OpCode::Ping, WireBuffer::from_slice(payload), target)
            .await?;
        Ok(reply.as_slice().to_vec())
    }
}

#[async_trait]
impl<T: RpcTransport> QuorumExchange for QuorumClient<T> {
    async fn lookup_hot_keys(
        &self,
        cold_keys: &[SignerId],
        target: SocketAddr,
    ) -> Result<Vec<(SignerId, HotKeyBinding)>, RpcError> {
        let cold_keys = &cold_keys[..cold_keys.len().min(MAX_KEYS_PER_REQUEST)];
        let request = encode_hot_keys_request(cold_keys)?;
        let reply = self
            .transport
            .request(OpCode::HotKeys, request, target)
            .await?;
        Ok(decode_hot_keys_reply(reply, cold_keys)?)
    }

    async fn lookup_record(
        &self,
        name: &str,
        hot_keys: &[(SignerId, Ed25519PublicKey)],
        target: SocketAddr,
    ) -> Result<LookupReply, RpcError> {
        let hot_keys = &hot_keys[..hot_keys.len().min(MAX_KEYS_PER_REQUEST)];
        let keys: Vec<_> = hot_keys.iter().map(|(_, key)| *key).collect();
        let request = encode_lookup_request(name, &keys)?;
        let reply = self
            .transport
            .request(OpCode::Lookup, request, target)
            .await?;

        let reply = decode_lookup_reply(reply, hot_keys)?;
        if !reply.rejected.is_empty() {
            warn!(
                peer = %target,
                name = %reply.content.name,
                rejected = reply.rejected.len(),
                "Peer served signatures that do not verify"
            );
        }
        Ok(reply)
    }
}

/// A record accepted by quorum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    /// Peer that served it.
    pub peer: SocketAddr,
    /// The signed fields.
    pub content: SignableContent,
    /// Valid signatures, at least `min_signatures` of them.
    pub signatures: SignatureSet,
}

/// Verified name lookup across a peer list.
pub struct QuorumResolver<X: QuorumExchange> {
    exchange: X,
    peers: Vec<SocketAddr>,
    trusted: Vec<SignerId>,
    min_signatures: usize,
}

impl<X: QuorumExchange> QuorumResolver<X> {
    /// Resolver asking `peers` and trusting signatures from `trusted`.
    pub fn new(
        exchange: X,
        peers: Vec<SocketAddr>,
        trusted: Vec<SignerId>,
        min_signatures: usize,
    ) -> Self {
        Self {
            exchange,
            peers,
            trusted,
            min_signatures,
        }
    }

    /// Look up `name`. Starts at a random peer and walks the list; a peer
    /// that fails, knows too few hot keys or serves a record that does not
    /// cover `name` is skipped. A reply that arrives with too few valid
    /// signatures ends the search.
    pub async fn resolve(&self, name: &str) -> Result<ResolvedRecord, ResolveError> {
        if self.peers.is_empty() {
            return Err(ResolveError::NoPeers);
        }

        let start = rand::thread_rng().gen_range(0..self.peers.len());
        let mut last = String::new();
        for step in 0..self.peers.len() {
            let peer = self.peers[(start + step) % self.peers.len()];
            match self.ask_peer(name, peer).await {
                Ok(reply) => return self.check_quorum(reply, peer),
                Err(e) => {
                    warn!(peer = %peer, name, error = %e, "Peer failed, trying next");
                    last = e.to_string();
                }
            }
        }

        Err(ResolveError::AllPeersFailed {
            attempts: self.peers.len(),
            last,
        })
    }

    async fn ask_peer(&self, name: &str, peer: SocketAddr) -> Result<LookupReply, ResolveError> {
        let bindings = self.exchange.lookup_hot_keys(&self.trusted, peer).await?;
        if bindings.len() < self.min_signatures {
            return Err(ResolveError::InsufficientHotKeys {
                have: bindings.len(),
                need: self.min_signatures,
            });
        }
        debug!(peer = %peer, keys = bindings.len(), "Fetched hot keys");

        let hot_keys: Vec<_> = bindings
            .into_iter()
            .map(|(id, binding)| (id, binding.hot_key))
            .collect();
        let reply = self.exchange.lookup_record(name, &hot_keys, peer).await?;
        if !reply.content.covers(name) {
            return Err(ResolveError::NotCovering {
                name: name.to_string(),
                record: reply.content.name,
                next: reply.content.next_name,
            });
        }
        Ok(reply)
    }

    fn check_quorum(&self, reply: LookupReply, peer: SocketAddr) -> Result<ResolvedRecord, ResolveError> {
        let have = reply.signatures.len();
        if have < self.min_signatures {
            return Err(ResolveError::QuorumShortfall {
                have,
                need: self.min_signatures,
            });
        }
        info!(
            peer = %peer,
            name = %reply.content.name,
            signatures = have,
            "Resolved name with quorum"
        );
        Ok(ResolvedRecord {
            peer,
            content: reply.content,
            signatures: reply.signatures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::protocol::{encode_hot_keys_reply, encode_lookup_reply};
    use shared_crypto::{Ed25519KeyPair, Ed25519Signature};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Signer {
        id: SignerId,
        cold: Ed25519KeyPair,
        hot: Ed25519KeyPair,
    }

    fn signer() -> Signer {
        let cold = Ed25519KeyPair::generate();
        Signer {
            id: SignerId::from(cold.public_key()),
            cold,
            hot: Ed25519KeyPair::generate(),
        }
    }

    fn content() -> SignableContent {
        SignableContent {
            height: 0x100,
            name: "h/alice".into(),
            next_name: "h/alice".into(),
            value: "{}".into(),
        }
    }

    /// Answers every peer from the same signer set; peers listed in
    /// `dead` time out.
    struct FakeTransport {
        served: SignableContent,
        signers: Vec<Signer>,
        signing: usize,
        dead: Vec<SocketAddr>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RpcTransport for FakeTransport {
        async fn request(
            &self,
            op: OpCode,
            payload: WireBuffer,
            target: SocketAddr,
        ) -> Result<WireBuffer, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.dead.contains(&target) {
                return Err(RpcError::Timeout {
                    target,
                    cookie: qn_01_wire_codec::Cookie::new(0),
                });
            }
            match op {
                OpCode::HotKeys => {
                    let ids = crate::domain::protocol::decode_hot_keys_request(payload)?;
                    Ok(encode_hot_keys_reply(&ids, 1020, |id| {
                        self.signers
                            .iter()
                            .find(|s| s.id == *id)
                            .map(|s| HotKeyBinding::create(&s.cold, s.hot.public_key()))
                    }))
                }
                OpCode::Lookup => {
                    let (_, keys) = crate::domain::protocol::decode_lookup_request(payload)?;
                    let binary = self.served.encode().unwrap();
                    let slots: Vec<_> = keys
                        .iter()
                        .map(|k| {
                            self.signers
                                .iter()
                                .take(self.signing)
                                .find(|s| s.hot.public_key().as_bytes() == k)
                                .map(|s| s.hot.sign(&binary))
                                .unwrap_or(Ed25519Signature::ZERO)
                        })
                        .collect();
                    Ok(encode_lookup_reply(&binary, &slots, 1020))
                }
                OpCode::Ping => Ok(payload),
            }
        }
    }

    fn peers(n: u16) -> Vec<SocketAddr> {
        (0..n)
            .map(|i| SocketAddr::from(([127, 0, 0, 1], 5000 + i)))
            .collect()
    }

    fn resolver(
        signing: usize,
        dead: Vec<SocketAddr>,
        peer_list: Vec<SocketAddr>,
        min: usize,
    ) -> (QuorumResolver<QuorumClient<FakeTransport>>, Arc<FakeTransport>) {
        resolver_serving(content(), signing, dead, peer_list, min)
    }

    fn resolver_serving(
        served: SignableContent,
        signing: usize,
        dead: Vec<SocketAddr>,
        peer_list: Vec<SocketAddr>,
        min: usize,
    ) -> (QuorumResolver<QuorumClient<FakeTransport>>, Arc<FakeTransport>) {
        let signers: Vec<_> = (0..3).map(|_| signer()).collect();
        let trusted = signers.iter().map(|s| s.id).collect();
        let transport = Arc::new(FakeTransport {
            served,
            signers,
            signing,
            dead,
            calls: AtomicUsize::new(0),
        });
        let client = QuorumClient::new(Arc::clone(&transport));
        (QuorumResolver::new(client, peer_list, trusted, min), transport)
    }

    #[tokio::test]
    async fn test_resolve_with_quorum() {
        let (resolver, _) = resolver(3, vec![], peers(1), 2);
        let record = resolver.resolve("h/alice").await.unwrap();
        assert_eq!(record.content, content());
        assert_eq!(record.signatures.len(), 3);
    }

    #[tokio::test]
    async fn test_quorum_shortfall_is_reported() {
        let (resolver, _) = resolver(1, vec![], peers(2), 2);
        assert!(matches!(
            resolver.resolve("h/alice").await,
            Err(ResolveError::QuorumShortfall { have: 1, need: 2 })
        ));
    }

    #[tokio::test]
    async fn test_dead_peers_are_skipped() {
        let list = peers(3);
        let (resolver, _) = resolver(3, list[..2].to_vec(), list.clone(), 2);
        let record = resolver.resolve("h/alice").await.unwrap();
        assert_eq!(record.peer, list[2]);
    }

    #[tokio::test]
    async fn test_all_peers_failed() {
        let list = peers(2);
        let (resolver, transport) = resolver(3, list.clone(), list, 2);
        assert!(matches!(
            resolver.resolve("h/alice").await,
            Err(ResolveError::AllPeersFailed { attempts: 2, .. })
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_too_few_hot_keys_moves_on() {
        let (resolver, _) = resolver(3, vec![], peers(1), 4);
        assert!(matches!(
            resolver.resolve("h/alice").await,
            Err(ResolveError::AllPeersFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_record_outside_query_is_rejected() {
        let served = SignableContent {
            name: "h/ann".into(),
            next_name: "h/bob".into(),
            ..content()
        };
        let (resolver, transport) = resolver_serving(served, 3, vec![], peers(2), 2);

        let expected = ResolveError::NotCovering {
            name: "h/zed".into(),
            record: "h/ann".into(),
            next: "h/bob".into(),
        };
        match resolver.resolve("h/zed").await {
            Err(ResolveError::AllPeersFailed { attempts: 2, last }) => {
                assert_eq!(last, expected.to_string());
            }
            other => panic!("expected AllPeersFailed, got {:?}", other),
        }
        // both peers asked for hot keys and the record
        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);

        // the same record is a valid answer inside its range
        let record = resolver.resolve("h/axe").await.unwrap();
        assert_eq!(record.content.name, "h/ann");
    }

    #[tokio::test]
    async fn test_no_peers() {
        let (resolver, _) = resolver(3, vec![], vec![], 1);
        assert!(matches!(
            resolver.resolve("h/alice").await,
            Err(ResolveError::NoPeers)
        ));
    }

    #[tokio::test]
    async fn test_ping_echoes() {
        let (resolver, _) = resolver(0, vec![], peers(1), 1);
        let echoed = resolver.exchange.ping(b"abc", peers(1)[0]).await.unwrap();
        assert_eq!(echoed, b"abc");
    }
}

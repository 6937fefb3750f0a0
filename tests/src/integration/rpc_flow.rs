//! # RPC Flow
//!
//! A [`RequestDispatcher`] serving a [`NameRegistry`] on a loopback socket,
//! queried through [`QuorumClient`] over a [`UdpRpcTransport`]:
//!
//! 1. ping echo
//! 2. hot-key exchange, unknown identities left out of the reply
//! 3. signed lookup, including a name that is bracketed by another record
//! 4. quorum resolution across a dead peer and a live one

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::net::UdpSocket;
    use tokio::sync::watch;

    use qn_02_name_records::{HotKeyBinding, HotKeySet, NameList, NameRecord, SignerId};
    use qn_03_quorum_rpc::{
        QuorumClient, QuorumExchange, QuorumResolver, RequestDispatcher, ResolveError,
        RpcError, TransportConfig, UdpRpcTransport,
    };
    use qn_04_name_sync::NameRegistry;
    use shared_crypto::Ed25519KeyPair;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

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

    /// Registry holding a signed ring `h/a -> h/c -> h/a`.
    fn signed_registry(signer: &Signer) -> Arc<NameRegistry> {
        let mut a = NameRecord::new("h/a/", "h/c/", r#"{"ip6":"fc00::a"}"#, 0x1000).unwrap();
        let mut c = NameRecord::new("h/c/", "h/a/", r#"{"ip6":"fc00::c"}"#, 0x1000).unwrap();
        a.sign(signer.id, &signer.hot);
        c.sign(signer.id, &signer.hot);
        Arc::new(NameRegistry::with_names(
            HotKeySet::new(signer.id, signer.binding()),
            NameList::from_records(vec![a, c]),
        ))
    }

    struct Server {
        addr: SocketAddr,
        _shutdown: watch::Sender<bool>,
    }

    async fn serve(registry: Arc<NameRegistry>) -> Server {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let addr = socket.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let dispatcher = RequestDispatcher::new(registry);
        tokio::spawn(async move { dispatcher.serve(socket, rx).await });
        Server {
            addr,
            _shutdown: tx,
        }
    }

    async fn client(timeout: Duration) -> QuorumClient<UdpRpcTransport> {
        let transport = UdpRpcTransport::bind(TransportConfig {
            bind_v4: "127.0.0.1:0".parse().unwrap(),
            bind_v6: None,
            request_timeout: timeout,
        })
        .await
        .unwrap();
        QuorumClient::new(Arc::new(transport))
    }

    // =============================================================================
    // INTEGRATION TESTS
    // =============================================================================

    #[tokio::test]
    async fn test_ping_echo() {
        let signer = Signer::new();
        let server = serve(signed_registry(&signer)).await;
        let client = client(Duration::from_secs(2)).await;

        let echoed = client.ping(b"are you there", server.addr).await.unwrap();
        assert_eq!(echoed, b"are you there");
    }

    #[tokio::test]
    async fn test_malformed_request_does_not_stop_server() {
        let signer = Signer::new();
        let server = serve(signed_registry(&signer)).await;

        let raw = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        raw.send_to(&[0xff], server.addr).await.unwrap();
        raw.send_to(&[0x02, 0, 0, 1, 0xff], server.addr).await.unwrap();

        let client = client(Duration::from_secs(2)).await;
        assert_eq!(client.ping(b"x", server.addr).await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_hot_key_exchange() {
        let signer = Signer::new();
        let server = serve(signed_registry(&signer)).await;
        let client = client(Duration::from_secs(2)).await;
        let stranger = Signer::new();

        let bindings = client
            .lookup_hot_keys(&[stranger.id, signer.id], server.addr)
            .await
            .unwrap();
        assert_eq!(bindings, vec![(signer.id, signer.binding())]);
    }

    #[tokio::test]
    async fn test_signed_lookup() {
        let signer = Signer::new();
        let server = serve(signed_registry(&signer)).await;
        let client = client(Duration::from_secs(2)).await;
        let keys = [(signer.id, signer.hot.public_key())];

        let reply = client.lookup_record("h/c", &keys, server.addr).await.unwrap();
        assert_eq!(reply.content.name, "h/c");
        assert_eq!(reply.content.next_name, "h/a");
        assert!(reply.signatures.contains(&signer.id));
        assert!(reply.rejected.is_empty());

        // absent name: the record whose range covers it proves absence
        let reply = client.lookup_record("h/b", &keys, server.addr).await.unwrap();
        assert_eq!(reply.content.name, "h/a");
        assert_eq!(reply.content.next_name, "h/c");
    }

    #[tokio::test]
    async fn test_lookup_on_empty_registry_times_out() {
        let signer = Signer::new();
        let registry = Arc::new(NameRegistry::new(HotKeySet::new(signer.id, signer.binding())));
        let server = serve(registry).await;
        let client = client(Duration::from_millis(200)).await;

        let result = client
            .lookup_record("h/a", &[(signer.id, signer.hot.public_key())], server.addr)
            .await;
        assert!(matches!(result, Err(RpcError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_resolver_skips_dead_peer() {
        let signer = Signer::new();
        let server = serve(signed_registry(&signer)).await;
        // bound but never answers
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let resolver = QuorumResolver::new(
            client(Duration::from_millis(200)).await,
            vec![silent.local_addr().unwrap(), server.addr],
            vec![signer.id],
            1,
        );
        let record = resolver.resolve("h/a").await.unwrap();
        assert_eq!(record.peer, server.addr);
        assert_eq!(record.content.name, "h/a");
        assert_eq!(record.signatures.len(), 1);
    }

    #[tokio::test]
    async fn test_resolver_needs_enough_hot_keys() {
        let signer = Signer::new();
        let absent = Signer::new();
        let server = serve(signed_registry(&signer)).await;

        let resolver = QuorumResolver::new(
            client(Duration::from_secs(1)).await,
            vec![server.addr],
            vec![signer.id, absent.id],
            2,
        );
        match resolver.resolve("h/a").await {
            Err(ResolveError::AllPeersFailed { attempts, .. }) => assert_eq!(attempts, 1),
            other => panic!("expected AllPeersFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolver_quorum_shortfall() {
        let signer = Signer::new();
        let lazy = Signer::new();
        let registry = signed_registry(&signer);
        // knows the second signer's key but holds none of its signatures
        registry.hot_keys_mut().apply(lazy.id, lazy.binding());
        let server = serve(registry).await;

        let resolver = QuorumResolver::new(
            client(Duration::from_secs(1)).await,
            vec![server.addr],
            vec![signer.id, lazy.id],
            2,
        );
        assert!(matches!(
            resolver.resolve("h/c").await,
            Err(ResolveError::QuorumShortfall { have: 1, need: 2 })
        ));
    }
}

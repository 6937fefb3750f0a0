//! # Sync Flow
//!
//! Three signers share one ledger. Each runs its own registry, dispatcher
//! and sync engine over loopback UDP:
//!
//! ```text
//! InMemoryLedger ──→ node0, node1, node2   (sync pass: every node signs its own copy)
//! node_i ←─ hot keys ─→ node_j             (refresh: every node learns every hot key)
//! node_i ←─ lookups  ─→ node_j             (gossip: records collect all three signatures)
//! QuorumResolver ──→ any node              (client gets a 3-of-3 record)
//! ```

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::net::UdpSocket;
    use tokio::sync::watch;

    use qn_02_name_records::{HotKeyBinding, SignerId, SnapshotStore};
    use qn_03_quorum_rpc::{
        QuorumClient, QuorumResolver, RequestDispatcher, TransportConfig, UdpRpcTransport,
    };
    use qn_04_name_sync::{
        authorize, InMemoryLedger, LedgerAuthorityResolver, LedgerName, LocalSigner,
        NameHistoryEntry, NameRegistry, NameSyncApi, NameSyncService, SyncConfig,
    };
    use shared_crypto::Ed25519KeyPair;

    type Service = NameSyncService<
        InMemoryLedger,
        LedgerAuthorityResolver<InMemoryLedger>,
        QuorumClient<UdpRpcTransport>,
    >;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Zone {
        key: Ed25519KeyPair,
        ledger: Arc<InMemoryLedger>,
    }

    impl Zone {
        fn new() -> Self {
            let key = Ed25519KeyPair::generate();
            let ledger = Arc::new(InMemoryLedger::new());
            ledger.set_height(0x2345);
            ledger.push_history(
                "h/nic/",
                NameHistoryEntry {
                    value: format!(r#"{{"signingKey":"{}"}}"#, key.public_key().to_hex()),
                    first_seen: 1,
                    block_height: 1,
                },
            );
            Self { key, ledger }
        }

        fn publish(&self, names: &[&str]) {
            let listing = names
                .iter()
                .map(|name| LedgerName {
                    name: name.to_string(),
                    value: format!(
                        r#"{{"ip6":"fc00::1","auth":"{}"}}"#,
                        authorize(&self.key, name, 100)
                    ),
                    first_seen: 100,
                })
                .collect();
            self.ledger.set_names(listing);
        }
    }

    struct Keys {
        id: SignerId,
        cold: Ed25519KeyPair,
        hot_seed: [u8; 32],
    }

    impl Keys {
        fn new() -> Self {
            let cold = Ed25519KeyPair::generate();
            Self {
                id: SignerId::from(cold.public_key()),
                cold,
                hot_seed: Ed25519KeyPair::generate().to_seed(),
            }
        }

        fn signer(&self) -> LocalSigner {
            let hot = Ed25519KeyPair::from_seed(self.hot_seed);
            let binding = HotKeyBinding::create(&self.cold, hot.public_key());
            LocalSigner::new(self.id, hot, binding)
        }
    }

    struct Node {
        addr: SocketAddr,
        service: Arc<Service>,
        shutdown: watch::Sender<bool>,
    }

    impl Node {
        fn registry(&self) -> &Arc<NameRegistry> {
            self.service.registry()
        }
    }

    async fn transport() -> Arc<UdpRpcTransport> {
        Arc::new(
            UdpRpcTransport::bind(TransportConfig {
                bind_v4: "127.0.0.1:0".parse().unwrap(),
                bind_v6: None,
                request_timeout: Duration::from_millis(500),
            })
            .await
            .unwrap(),
        )
    }

    /// Bind one dispatcher socket per signer first so every node can be
    /// given the others as peers.
    async fn cluster(zone: &Zone, keys: &[Keys]) -> Vec<Node> {
        let mut sockets = Vec::new();
        for _ in keys {
            sockets.push(Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap()));
        }
        let addrs: Vec<SocketAddr> = sockets.iter().map(|s| s.local_addr().unwrap()).collect();
        let trusted: Vec<SignerId> = keys.iter().map(|k| k.id).collect();

        let mut nodes = Vec::new();
        for (i, (k, socket)) in keys.iter().zip(sockets).enumerate() {
            let signer = k.signer();
            let registry = Arc::new(NameRegistry::new(signer.initial_key_set()));
            let config = SyncConfig {
                trusted_keys: trusted.clone(),
                peers: addrs.iter().copied().filter(|a| *a != addrs[i]).collect(),
                ..SyncConfig::default()
            };
            let service = NameSyncService::new(
                config,
                Arc::clone(&registry),
                signer,
                Arc::clone(&zone.ledger),
                Arc::new(LedgerAuthorityResolver::new(Arc::clone(&zone.ledger))),
                Arc::new(QuorumClient::new(transport().await)),
            );

            let (shutdown, rx) = watch::channel(false);
            let dispatcher = RequestDispatcher::new(registry);
            tokio::spawn(async move { dispatcher.serve(socket, rx).await });

            nodes.push(Node {
                addr: addrs[i],
                service: Arc::new(service),
                shutdown,
            });
        }
        nodes
    }

    async fn sync_all(nodes: &[Node]) {
        for node in nodes {
            node.service.sync_pass().await.unwrap();
        }
    }

    /// Refresh until every node knows every hot key.
    async fn exchange_keys(nodes: &[Node], group: usize) {
        for _ in 0..50 {
            if nodes.iter().all(|n| n.registry().hot_keys().len() == group) {
                return;
            }
            for node in nodes {
                node.service.refresh_hot_keys_once().await.unwrap();
            }
        }
        panic!("hot keys did not spread");
    }

    fn fully_signed(node: &Node, group: usize) -> bool {
        node.registry()
            .names()
            .iter()
            .all(|r| r.signatures().len() == group)
    }

    /// Gossip until every record on every node carries `group` signatures.
    async fn gossip_until_signed(nodes: &[Node], group: usize) {
        for _ in 0..500 {
            if nodes.iter().all(|n| fully_signed(n, group)) {
                return;
            }
            for node in nodes {
                node.service.gossip_signatures_once().await.unwrap();
            }
        }
        panic!("signatures did not converge");
    }

    // =============================================================================
    // INTEGRATION TESTS
    // =============================================================================

    #[tokio::test]
    async fn test_three_signers_reach_quorum() {
        let zone = Zone::new();
        zone.publish(&["h/alpha/", "h/bravo/", "h/charlie/"]);
        let keys: Vec<Keys> = (0..3).map(|_| Keys::new()).collect();
        let nodes = cluster(&zone, &keys).await;

        sync_all(&nodes).await;
        for node in &nodes {
            assert_eq!(node.registry().len(), 3);
            assert!(fully_signed(node, 1));
        }

        exchange_keys(&nodes, 3).await;
        gossip_until_signed(&nodes, 3).await;

        // identical signed lists everywhere
        let reference = nodes[0].registry().snapshot();
        for node in &nodes[1..] {
            let list = node.registry().snapshot();
            for (a, b) in reference.iter().zip(list.iter()) {
                assert_eq!(a.binary(), b.binary());
            }
        }

        let resolver = QuorumResolver::new(
            QuorumClient::new(transport().await),
            nodes.iter().map(|n| n.addr).collect(),
            keys.iter().map(|k| k.id).collect(),
            3,
        );
        let record = resolver.resolve("h/bravo").await.unwrap();
        assert_eq!(record.content.name, "h/bravo");
        // shorter names sort first, so bravo links to charlie
        assert_eq!(record.content.next_name, "h/charlie");
        assert_eq!(record.signatures.len(), 3);

        for node in &nodes {
            let _ = node.shutdown.send(true);
        }
    }

    #[tokio::test]
    async fn test_removed_name_disappears_everywhere() {
        let zone = Zone::new();
        zone.publish(&["h/a/", "h/b/", "h/c/"]);
        let keys: Vec<Keys> = (0..2).map(|_| Keys::new()).collect();
        let nodes = cluster(&zone, &keys).await;
        sync_all(&nodes).await;
        exchange_keys(&nodes, 2).await;
        gossip_until_signed(&nodes, 2).await;

        zone.publish(&["h/a/", "h/b/"]);
        sync_all(&nodes).await;
        gossip_until_signed(&nodes, 2).await;

        for node in &nodes {
            let names = node.registry().names();
            let links: Vec<_> = names
                .iter()
                .map(|r| (r.name().to_string(), r.next_name().to_string()))
                .collect();
            assert_eq!(
                links,
                vec![
                    ("h/a".to_string(), "h/b".to_string()),
                    ("h/b".to_string(), "h/a".to_string())
                ]
            );
            assert!(names.verify_invariants().is_ok());
        }

        let resolver = QuorumResolver::new(
            QuorumClient::new(transport().await),
            vec![nodes[1].addr],
            keys.iter().map(|k| k.id).collect(),
            2,
        );
        // "h/c" is gone; the covering record proves it
        let record = resolver.resolve("h/c").await.unwrap();
        assert_eq!(record.content.name, "h/b");
        assert_eq!(record.content.next_name, "h/a");
    }

    #[tokio::test]
    async fn test_restart_keeps_gossiped_signatures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node0.db");
        let zone = Zone::new();
        zone.publish(&["h/a/", "h/b/"]);
        let keys: Vec<Keys> = (0..2).map(|_| Keys::new()).collect();
        let nodes = cluster(&zone, &keys).await;
        sync_all(&nodes).await;
        exchange_keys(&nodes, 2).await;
        gossip_until_signed(&nodes, 2).await;

        SnapshotStore::new(&path)
            .save(&nodes[0].registry().snapshot())
            .unwrap();

        // fresh process for signer 0 that has already relearned the peer key
        let signer = keys[0].signer();
        let registry = Arc::new(NameRegistry::new(signer.initial_key_set()));
        for (id, binding) in nodes[0].registry().hot_keys().iter() {
            registry.hot_keys_mut().apply(*id, *binding);
        }
        let restarted = NameSyncService::new(
            nodes[0].service.config().clone(),
            registry,
            signer,
            Arc::clone(&zone.ledger),
            Arc::new(LedgerAuthorityResolver::new(Arc::clone(&zone.ledger))),
            Arc::new(QuorumClient::new(transport().await)),
        )
        .with_store(SnapshotStore::new(&path));

        assert_eq!(restarted.load_snapshot().unwrap(), 2);
        let report = restarted.sync_pass().await.unwrap();
        assert!(report.is_noop());
        assert!(restarted
            .registry()
            .names()
            .iter()
            .all(|r| r.signatures().len() == 2));
    }
}

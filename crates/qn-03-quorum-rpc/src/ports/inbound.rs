//! Inbound port: what the rest of the node calls to talk to peers.

use crate::domain::errors::RpcError;
use crate::domain::protocol::LookupReply;
use async_trait::async_trait;
use qn_02_name_records::{HotKeyBinding, SignerId};
use shared_crypto::Ed25519PublicKey;
use std::net::SocketAddr;

/// Key and signature exchange with a single peer.
#[async_trait]
pub trait QuorumExchange: Send + Sync {
    /// Ask `target` for the hot keys of `cold_keys`. Only bindings that
    /// verify against their cold key are returned.
    async fn lookup_hot_keys(
        &self,
        cold_keys: &[SignerId],
        target: SocketAddr,
    ) -> Result<Vec<(SignerId, HotKeyBinding)>, RpcError>;

    /// Ask `target` for the record covering `name`, with one signature
    /// slot per entry of `hot_keys`.
    async fn lookup_record(
        &self,
        name: &str,
        hot_keys: &[(SignerId, Ed25519PublicKey)],
        target: SocketAddr,
    ) -> Result<LookupReply, RpcError>;
}

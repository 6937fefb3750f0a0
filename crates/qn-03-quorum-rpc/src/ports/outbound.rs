//! Outbound ports: what this crate needs from its host.

use crate::domain::errors::RpcError;
use async_trait::async_trait;
use qn_01_wire_codec::{OpCode, WireBuffer};
use qn_02_name_records::{HotKeyBinding, SignerId};
use shared_crypto::{Ed25519Signature, PUBLIC_KEY_SIZE};
use std::net::SocketAddr;

/// Request/response datagram exchange.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Send `payload` as an `op` request to `target` and wait for the
    /// reply payload, header stripped.
    async fn request(
        &self,
        op: OpCode,
        payload: WireBuffer,
        target: SocketAddr,
    ) -> Result<WireBuffer, RpcError>;
}

/// A record ready to serve: signed bytes plus one slot per requested key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedLookup {
    /// Canonical signed bytes of the covering record.
    pub binary: Vec<u8>,
    /// Signature per requested hot key; zero where unknown or unsigned.
    pub slots: Vec<Ed25519Signature>,
}

/// Read access to the local records and key bindings, used to answer peers.
pub trait RecordSource: Send + Sync {
    /// Binding currently held for `identity`.
    fn hot_key_binding(&self, identity: &SignerId) -> Option<HotKeyBinding>;

    /// The record covering `name` with a slot for each of `hot_keys`.
    /// `None` when nothing is held.
    fn signed_lookup(&self, name: &str, hot_keys: &[[u8; PUBLIC_KEY_SIZE]]) -> Option<SignedLookup>;
}

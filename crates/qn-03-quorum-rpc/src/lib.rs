//! # Quorum RPC
//!
//! The peer protocol of a Quorum-Names node, both directions.
//!
//! ## Operations
//!
//! | Op | Request | Reply |
//! |----|---------|-------|
//! | `0` ping | opaque bytes | same bytes |
//! | `1` hot-keys | N x 32-byte cold keys | `u32` manifest, then `(sig:64, hot key:32)` per set bit |
//! | `2` lookup | list(name), then N x 32-byte hot keys | signable record, then one 64-byte slot per hot key |
//!
//! Every datagram carries the 4-byte [`Header`](qn_01_wire_codec::Header).
//! Replies are capped at [`DATAGRAM_BUDGET`](qn_01_wire_codec::DATAGRAM_BUDGET)
//! bytes; lookup replies drop trailing signature slots to fit and clients
//! accept short slot lists.
//!
//! ## Architecture
//!
//! - **Domain Layer:** wire codecs for each operation, the pending
//!   request table and the error taxonomy.
//! - **Ports Layer:** [`QuorumExchange`] (what callers use), [`RpcTransport`]
//!   and [`RecordSource`] (what this crate needs).
//! - **Adapters Layer:** [`UdpRpcTransport`] on tokio sockets.
//! - [`QuorumClient`] / [`QuorumResolver`]: client side with round-robin
//!   peer retry and quorum check.
//! - [`RequestDispatcher`]: server side, one reply per well-formed request.

pub mod adapters;
pub mod client;
pub mod dispatcher;
pub mod domain;
pub mod ports;

pub use adapters::udp::{TransportConfig, UdpRpcTransport};
pub use client::{QuorumClient, QuorumResolver, ResolvedRecord};
pub use dispatcher::RequestDispatcher;
pub use domain::errors::{ProtocolError, ResolveError, RpcError};
pub use domain::pending::{PendingRequests, PendingStats};
pub use domain::protocol::{LookupReply, MAX_KEYS_PER_REQUEST};
pub use ports::inbound::QuorumExchange;
pub use ports::outbound::{RecordSource, RpcTransport, SignedLookup};

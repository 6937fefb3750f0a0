//! Error taxonomy for the peer protocol.
//!
//! - [`ProtocolError`]: a datagram did not decode or a binding did not
//!   verify. The dispatcher logs and drops; the client fails the call.
//! - [`RpcError`]: one request/response exchange failed.
//! - [`ResolveError`]: a quorum lookup across the peer list failed.

use qn_01_wire_codec::{Cookie, WireError};
use qn_02_name_records::{RecordError, SignerId};
use std::net::SocketAddr;
use thiserror::Error;

/// Malformed or unverifiable protocol data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Framing failure.
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    /// Signable content did not decode.
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// More keys than a manifest can describe.
    #[error("Too many keys in request: {0} (max 32)")]
    TooManyKeys(usize),

    /// Key block length not a multiple of 32.
    #[error("Key block of {0} bytes is not a multiple of 32")]
    MisalignedKeys(usize),

    /// Lookup request must carry exactly one name.
    #[error("Lookup request carries {0} names, expected 1")]
    BadNameList(usize),

    /// Requested name is not UTF-8.
    #[error("Lookup name is not valid UTF-8")]
    InvalidName,

    /// Manifest has bits beyond the requested key count.
    #[error("Manifest {manifest:#010x} has bits beyond {requested} requested keys")]
    InvalidManifest {
        /// Received bit-field.
        manifest: u32,
        /// Number of keys asked for.
        requested: usize,
    },

    /// A returned hot key is not a valid curve point.
    #[error("Invalid hot key for {0}")]
    InvalidHotKey(SignerId),

    /// A returned hot key is not signed by the cold key it was requested for.
    #[error("Hot-key binding for {0} does not verify")]
    BadBinding(SignerId),
}

/// Failure of one request/response exchange.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No reply before the deadline.
    #[error("Request {cookie} to {target} timed out")]
    Timeout {
        /// Peer the request went to.
        target: SocketAddr,
        /// Cookie that was abandoned.
        cookie: Cookie,
    },

    /// Socket send or bind failed.
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    /// No socket bound for the target's address family.
    #[error("No socket for address family of {0}")]
    NoSocket(SocketAddr),

    /// Could not find a free cookie.
    #[error("Cookie space exhausted")]
    CookiesExhausted,

    /// The transport shut down while waiting.
    #[error("Transport closed")]
    Closed,

    /// The reply did not decode or verify.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Failure of a quorum lookup.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Nobody to ask.
    #[error("No peers configured")]
    NoPeers,

    /// A peer returned fewer hot keys than the quorum needs.
    #[error("Peer knows {have} hot keys, quorum needs {need}")]
    InsufficientHotKeys {
        /// Valid bindings returned.
        have: usize,
        /// Configured minimum.
        need: usize,
    },

    /// Every peer failed at transport or protocol level.
    #[error("All {attempts} peers failed, last error: {last}")]
    AllPeersFailed {
        /// Peers tried.
        attempts: usize,
        /// Last failure seen.
        last: String,
    },

    /// A peer answered with a record whose range does not hold the query.
    #[error("Record [{record}, {next}) does not cover {name}")]
    NotCovering {
        /// Name asked for.
        name: String,
        /// Record served.
        record: String,
        /// Its successor.
        next: String,
    },

    /// A reply arrived with too few valid signatures.
    #[error("Quorum shortfall: {have} valid signatures, {need} required")]
    QuorumShortfall {
        /// Valid signatures in the reply.
        have: usize,
        /// Configured minimum.
        need: usize,
    },

    /// Single-peer exchange failure.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

//! Cross-crate flows over real sockets.

pub mod rpc_flow;
pub mod sync_flow;

//! # Quorum-Names Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── name_benchmarks.rs   # lookup, merge and codec timings
//! └── src/integration/
//!     ├── rpc_flow.rs          # client, dispatcher and resolver over loopback UDP
//!     └── sync_flow.rs         # three signers syncing, gossiping and serving a quorum
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qn-tests
//! cargo test -p qn-tests integration::sync_flow
//!
//! # Benchmarks
//! cargo bench -p qn-tests
//! ```

pub mod integration;

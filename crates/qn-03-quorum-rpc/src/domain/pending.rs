//! Pending request table.
//!
//! Maps 24-bit cookies to callers waiting on a reply. The receive loop
//! calls [`PendingRequests::complete`] for every inbound reply; the caller
//! awaits its receiver or times out and calls [`PendingRequests::expire`].

use crate::domain::errors::RpcError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use qn_01_wire_codec::{Cookie, Header, OpCode, WireBuffer};
use rand::Rng;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Attempts at finding an unused cookie before giving up.
const MAX_COOKIE_ATTEMPTS: usize = 16;

/// A request waiting for its reply.
struct PendingRequest {
    /// Delivers the reply payload, header already consumed.
    sender: oneshot::Sender<WireBuffer>,
    /// Op byte a matching reply must carry.
    expected_op: u8,
    /// Peer the request went to.
    target: SocketAddr,
    /// When the request was registered.
    created_at: Instant,
}

/// Counters for the pending table.
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Requests registered.
    pub total_registered: AtomicU64,
    /// Replies delivered.
    pub total_completed: AtomicU64,
    /// Requests abandoned on timeout.
    pub total_timeouts: AtomicU64,
    /// Replies that matched no pending request.
    pub total_unmatched: AtomicU64,
}

/// Cookie to waiting caller.
#[derive(Default)]
pub struct PendingRequests {
    pending: DashMap<Cookie, PendingRequest>,
    stats: PendingStats,
}

impl PendingRequests {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh random cookie for a request of kind `op` to `target`.
    pub fn register(
        &self,
        op: OpCode,
        target: SocketAddr,
    ) -> Result<(Cookie, oneshot::Receiver<WireBuffer>), RpcError> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_COOKIE_ATTEMPTS {
            let cookie = Cookie::new(rng.gen_range(0..=Cookie::MAX));
            if let Entry::Vacant(slot) = self.pending.entry(cookie) {
                let (tx, rx) = oneshot::channel();
                slot.insert(PendingRequest {
                    sender: tx,
                    expected_op: op.response_byte(),
                    target,
                    created_at: Instant::now(),
                });
                self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
                debug!(cookie = %cookie, op = ?op, target = %target, "Registered pending request");
                return Ok((cookie, rx));
            }
        }
        Err(RpcError::CookiesExhausted)
    }

    /// Deliver a reply. Returns false when no request with this cookie and
    /// matching op is pending; a request whose op differs stays pending.
    pub fn complete(&self, header: Header, payload: WireBuffer, from: SocketAddr) -> bool {
        let Some((cookie, pending)) = self
            .pending
            .remove_if(&header.cookie, |_, p| p.expected_op == header.op)
        else {
            self.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
            debug!(
                cookie = %header.cookie,
                op = header.op,
                from = %from,
                "Reply for unknown cookie or mismatched op"
            );
            return false;
        };

        if pending.target != from {
            debug!(cookie = %cookie, expected = %pending.target, from = %from, "Reply from unexpected address");
        }
        let elapsed_ms = pending.created_at.elapsed().as_millis();
        if pending.sender.send(payload).is_ok() {
            self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
            debug!(cookie = %cookie, elapsed_ms, "Completed pending request");
            true
        } else {
            // caller already gave up
            false
        }
    }

    /// Abandon the request under `cookie` after a timeout or send failure.
    pub fn expire(&self, cookie: Cookie) -> bool {
        match self.pending.remove(&cookie) {
            Some((_, pending)) => {
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    cookie = %cookie,
                    target = %pending.target,
                    elapsed_ms = pending.created_at.elapsed().as_millis(),
                    "Abandoned pending request"
                );
                true
            }
            None => false,
        }
    }

    /// Requests currently awaiting a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// True if `cookie` is outstanding.
    #[must_use]
    pub fn is_pending(&self, cookie: Cookie) -> bool {
        self.pending.contains_key(&cookie)
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

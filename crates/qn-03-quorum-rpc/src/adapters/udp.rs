//! # UDP Transport
//!
//! [`RpcTransport`] over a pair of tokio UDP sockets, one per address
//! family. A background task per socket reads replies and hands them to
//! the [`PendingRequests`] table by cookie.
//!
//! These sockets only carry outgoing requests and their replies; serving
//! peers is the [`RequestDispatcher`](crate::RequestDispatcher)'s job on
//! the node's listening socket.

use crate::domain::errors::RpcError;
use crate::domain::pending::PendingRequests;
use crate::ports::outbound::RpcTransport;
use async_trait::async_trait;
use qn_01_wire_codec::{Cookie, Header, OpCode, WireBuffer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Receive buffer; larger than anything a well-behaved peer sends.
const RECV_BUFFER: usize = 2048;

/// Transport settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Local address for IPv4 requests.
    pub bind_v4: SocketAddr,
    /// Local address for IPv6 requests; `None` disables IPv6.
    pub bind_v6: Option<SocketAddr>,
    /// How long to wait for a reply.
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_v4: SocketAddr::from(([0, 0, 0, 0], 0)),
            bind_v6: Some(SocketAddr::from(([0u16; 8], 0))),
            request_timeout: Duration::from_secs(4),
        }
    }
}

/// Cookie-multiplexed request/response over UDP.
pub struct UdpRpcTransport {
    v4: Option<Arc<UdpSocket>>,
    v6: Option<Arc<UdpSocket>>,
    pending: Arc<PendingRequests>,
    request_timeout: Duration,
    receivers: Vec<JoinHandle<()>>,
}

impl UdpRpcTransport {
    /// Bind sockets and start the receive loops. Must run inside a tokio
    /// runtime. An IPv6 bind failure only disables IPv6.
    pub async fn bind(config: TransportConfig) -> Result<Self, RpcError> {
        let pending = Arc::new(PendingRequests::new());
        let mut receivers = Vec::new();

        let v4 = Arc::new(UdpSocket::bind(config.bind_v4).await?);
        receivers.push(tokio::spawn(receive_loop(
            Arc::clone(&v4),
            Arc::clone(&pending),
        )));

        let v6 = match config.bind_v6 {
            Some(addr) => match UdpSocket::bind(addr).await {
                Ok(socket) => {
                    let socket = Arc::new(socket);
                    receivers.push(tokio::spawn(receive_loop(
                        Arc::clone(&socket),
                        Arc::clone(&pending),
                    )));
                    Some(socket)
                }
                Err(e) => {
                    warn!(addr = %addr, error = %e, "IPv6 bind failed, IPv6 peers unreachable");
                    None
                }
            },
            None => None,
        };

        info!(
            v4 = ?v4.local_addr().ok(),
            v6 = ?v6.as_ref().and_then(|s| s.local_addr().ok()),
            timeout_ms = config.request_timeout.as_millis(),
            "RPC transport bound"
        );

        Ok(Self {
            v4: Some(v4),
            v6,
            pending,
            request_timeout: config.request_timeout,
            receivers,
        })
    }

    /// The pending request table.
    #[must_use]
    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Local address of the IPv4 socket.
    pub fn local_addr_v4(&self) -> Option<SocketAddr> {
        self.v4.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn socket_for(&self, target: SocketAddr) -> Result<&Arc<UdpSocket>, RpcError> {
        let socket = if target.is_ipv6() { &self.v6 } else { &self.v4 };
        socket.as_ref().ok_or(RpcError::NoSocket(target))
    }
}

impl Drop for UdpRpcTransport {
    fn drop(&mut self) {
        for handle in &self.receivers {
            handle.abort();
        }
    }
}

/// Releases a cookie when its request ends without a reply, including when
/// the caller drops the request future.
struct CookieGuard<'a> {
    pending: &'a PendingRequests,
    cookie: Cookie,
}

impl Drop for CookieGuard<'_> {
    fn drop(&mut self) {
        // no-op once the reply has been delivered
        self.pending.expire(self.cookie);
    }
}

#[async_trait]
impl RpcTransport for UdpRpcTransport {
    async fn request(
        &self,
        op: OpCode,
        mut payload: WireBuffer,
        target: SocketAddr,
    ) -> Result<WireBuffer, RpcError> {
        let socket = self.socket_for(target)?;
        let (cookie, reply) = self.pending.register(op, target)?;
        let _guard = CookieGuard {
            pending: &self.pending,
            cookie,
        };
        Header::request(op, cookie).push_onto(&mut payload);

        socket.send_to(payload.as_slice(), target).await?;

        match tokio::time::timeout(self.request_timeout, reply).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(RpcError::Closed),
            Err(_) => Err(RpcError::Timeout { target, cookie }),
        }
    }
}

async fn receive_loop(socket: Arc<UdpSocket>, pending: Arc<PendingRequests>) {
    let mut buf = vec![0u8; RECV_BUFFER];
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                // ICMP errors surface here on some platforms
                debug!(error = %e, "UDP receive failed");
                continue;
            }
        };

        let mut payload = WireBuffer::from_slice(&buf[..len]);
        let header = match Header::pop_from(&mut payload) {
            Ok(header) => header,
            Err(e) => {
                debug!(from = %from, error = %e, "Dropping runt datagram");
                continue;
            }
        };
        if !header.is_response() {
            debug!(from = %from, op = header.op, "Ignoring request on client socket");
            continue;
        }
        pending.complete(header, payload, from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config(timeout: Duration) -> TransportConfig {
        TransportConfig {
            bind_v4: "127.0.0.1:0".parse().unwrap(),
            bind_v6: None,
            request_timeout: timeout,
        }
    }

    /// Echo server that answers every request with `op | 0x80`.
    async fn spawn_echo(respond_op: Option<u8>) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 2048];
            loop {
                let (len, from) = socket.recv_from(&mut buf).await.unwrap();
                let mut reply = buf[..len].to_vec();
                reply[0] = respond_op.unwrap_or(reply[0] | 0x80);
                socket.send_to(&reply, from).await.unwrap();
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_request_reply() {
        let server = spawn_echo(None).await;
        let transport = UdpRpcTransport::bind(loopback_config(Duration::from_secs(2)))
            .await
            .unwrap();

        let reply = transport
            .request(OpCode::Ping, WireBuffer::from_slice(b"hello"), server)
            .await
            .unwrap();
        assert_eq!(reply.as_slice(), b"hello");
        assert_eq!(transport.pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_releases_cookie() {
        // bound but never answers
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = silent.local_addr().unwrap();
        let transport = UdpRpcTransport::bind(loopback_config(Duration::from_millis(100)))
            .await
            .unwrap();

        let result = transport
            .request(OpCode::Ping, WireBuffer::from_slice(b"x"), target)
            .await;
        assert!(matches!(result, Err(RpcError::Timeout { .. })));
        assert_eq!(transport.pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_request_releases_cookie() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = silent.local_addr().unwrap();
        let transport = UdpRpcTransport::bind(loopback_config(Duration::from_secs(30)))
            .await
            .unwrap();

        // caller gives up long before the transport timeout
        let result = tokio::time::timeout(
            Duration::from_millis(100),
            transport.request(OpCode::Ping, WireBuffer::from_slice(b"x"), target),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(transport.pending().pending_count(), 0);
        let stats = transport.pending().stats();
        assert_eq!(stats.total_timeouts.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_wrong_op_reply_is_ignored() {
        // answers a ping with a lookup reply
        let server = spawn_echo(Some(OpCode::Lookup.response_byte())).await;
        let transport = UdpRpcTransport::bind(loopback_config(Duration::from_millis(200)))
            .await
            .unwrap();

        let result = transport
            .request(OpCode::Ping, WireBuffer::from_slice(b"x"), server)
            .await;
        assert!(matches!(result, Err(RpcError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_no_socket_for_family() {
        let transport = UdpRpcTransport::bind(loopback_config(Duration::from_millis(100)))
            .await
            .unwrap();
        let target: SocketAddr = "[::1]:9".parse().unwrap();
        assert!(matches!(
            transport.request(OpCode::Ping, WireBuffer::new(), target).await,
            Err(RpcError::NoSocket(_))
        ));
    }
}

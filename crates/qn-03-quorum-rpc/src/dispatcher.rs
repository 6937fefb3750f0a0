//! # Request Dispatcher
//!
//! Answers peer requests from a [`RecordSource`]. Every well-formed
//! request gets exactly one reply carrying the request's cookie and the
//! response flag. Malformed requests are logged and dropped; replies
//! arriving on the listening socket are ignored.

use crate::domain::errors::ProtocolError;
use crate::domain::protocol::{
    decode_hot_keys_request, decode_lookup_request, encode_hot_keys_reply, encode_lookup_reply,
};
use crate::ports::outbound::RecordSource;
use qn_01_wire_codec::{Header, OpCode, WireBuffer, DATAGRAM_BUDGET, HEADER_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Largest datagram accepted from a peer.
const MAX_REQUEST: usize = 2048;

/// Server side of the peer protocol.
pub struct RequestDispatcher<S: RecordSource> {
    source: Arc<S>,
    /// Payload bytes available after the header.
    budget: usize,
}

impl<S: RecordSource> RequestDispatcher<S> {
    /// Dispatcher answering from `source`.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            budget: DATAGRAM_BUDGET - HEADER_SIZE,
        }
    }

    /// Handle one datagram. `Ok(None)` means nothing to send back.
    pub fn handle_datagram(&self, datagram: &[u8]) -> Result<Option<Vec<u8>>, ProtocolError> {
        let mut buf = WireBuffer::from_slice(datagram);
        let header = Header::pop_from(&mut buf)?;
        if header.is_response() {
            debug!(cookie = %header.cookie, "Ignoring reply on listening socket");
            return Ok(None);
        }

        let mut reply = match header.op_code() {
            Some(OpCode::Ping) => buf,
            Some(OpCode::HotKeys) => {
                let requested = decode_hot_keys_request(buf)?;
                encode_hot_keys_reply(&requested, self.budget, |id| {
                    self.source.hot_key_binding(id)
                })
            }
            Some(OpCode::Lookup) => {
                let (name, hot_keys) = decode_lookup_request(buf)?;
                match self.source.signed_lookup(&name, &hot_keys) {
                    Some(found) => encode_lookup_reply(&found.binary, &found.slots, self.budget),
                    None => {
                        debug!(name = %name, "No records to answer lookup");
                        return Ok(None);
                    }
                }
            }
            None => {
                debug!(op = header.op, "Unknown operation");
                return Ok(None);
            }
        };

        header.reply().push_onto(&mut reply);
        Ok(Some(reply.into_vec()))
    }

    /// Serve requests on `socket` until `shutdown` flips to true.
    pub async fn serve(&self, socket: Arc<UdpSocket>, mut shutdown: watch::Receiver<bool>) {
        let local = socket.local_addr().ok();
        info!(addr = ?local, "Serving name lookups");

        let mut buf = vec![0u8; MAX_REQUEST];
        loop {
            tokio::select! {
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, from)) => self.answer(&socket, &buf[..len], from).await,
                        Err(e) => debug!(error = %e, "UDP receive failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(addr = ?local, "Dispatcher shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn answer(&self, socket: &UdpSocket, datagram: &[u8], from: SocketAddr) {
        match self.handle_datagram(datagram) {
            Ok(Some(reply)) => {
                if let Err(e) = socket.send_to(&reply, from).await {
                    warn!(peer = %from, error = %e, "Failed to send reply");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(peer = %from, error = %e, "Dropping malformed request"),
        }
    }
}

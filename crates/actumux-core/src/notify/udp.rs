//! UDP notification sink

use std::net::{IpAddr, SocketAddr, UdpSocket};

use super::{NotificationEvent, NotificationSink};

/// Fixed port the remote display peers listen on
pub const UDP_NOTIFY_PORT: u16 = 21324;

/// Broadcasts each event as one JSON datagram to a set of peers.
pub struct UdpSink {
    peers: Vec<SocketAddr>,
    socket: Option<UdpSocket>,
}

impl UdpSink {
    /// Create a sink for `peers`, each addressed on [`UDP_NOTIFY_PORT`].
    ///
    /// Binding the local socket can fail; the sink is still constructed
    /// and simply drops every event, per the fire-and-forget contract.
    pub fn new(peers: impl IntoIterator<Item = IpAddr>) -> Self {
        let socket = match UdpSocket::bind(("0.0.0.0", 0)) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "udp notification socket unavailable");
                None
            }
        };
        Self {
            peers: peers
                .into_iter()
                .map(|ip| SocketAddr::new(ip, UDP_NOTIFY_PORT))
                .collect(),
            socket,
        }
    }
}

impl NotificationSink for UdpSink {
    fn notify(&self, event: &NotificationEvent) {
        let Some(socket) = &self.socket else { return };
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(error = %e, "udp notification encode failed");
                return;
            }
        };
        for peer in &self.peers {
            if let Err(e) = socket.send_to(&payload, peer) {
                tracing::debug!(%peer, error = %e, "udp notification dropped");
            }
        }
    }
}

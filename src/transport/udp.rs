use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use log::{debug, warn};
use tokio::net::UdpSocket;

use crate::config::RECV_BUFFER_SIZE;
use crate::protocol::{self, Message, MAX_DATAGRAM_SIZE};
use crate::transport::Transport;

/// UDP transport carrying one JSON message per datagram.
pub struct UdpTransport {
    socket: UdpSocket,
    local: SocketAddr,
    recv_timeout: Duration,
}

impl UdpTransport {
    /// Bind `0.0.0.0:<port>` with broadcast enabled.
    pub async fn bind(port: u16, recv_timeout: Duration) -> anyhow::Result<Self> {
        Self::bind_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), recv_timeout).await
    }

    pub async fn bind_addr(addr: SocketAddr, recv_timeout: Duration) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("cannot bind {}: {}", addr, e))?;
        socket.set_broadcast(true)?;
        let local = socket.local_addr()?;
        debug!("udp transport bound to {}", local);
        Ok(Self {
            socket,
            local,
            recv_timeout,
        })
    }
}

#[async_trait::async_trait]
impl Transport for UdpTransport {
    async fn send(&self, msg: &Message, addr: SocketAddr) {
        let bytes = match protocol::encode(msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("not sending {} to {}: {}", msg.kind(), addr, e);
                return;
            }
        };
        if let Err(e) = self.socket.send_to(&bytes, addr).await {
            warn!("send of {} to {} failed: {}", msg.kind(), addr, e);
        }
    }

    async fn recv(&self) -> Option<(Message, SocketAddr)> {
        // One spare byte so oversize datagrams are detected rather than truncated.
        let mut buf = vec![0u8; RECV_BUFFER_SIZE.max(MAX_DATAGRAM_SIZE) + 1];
        let (len, from) = match tokio::time::timeout(self.recv_timeout, self.socket.recv_from(&mut buf)).await {
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                debug!("recv failed: {}", e);
                return None;
            }
            Err(_) => return None,
        };
        match protocol::decode(&buf[..len]) {
            Ok(msg) => Some((msg, from)),
            Err(e) => {
                warn!("dropping datagram from {}: {}", from, e);
                None
            }
        }
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }
}

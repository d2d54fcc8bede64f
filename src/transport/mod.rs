use std::net::SocketAddr;
use std::sync::Arc;

use crate::protocol::Message;

/// Datagram transport shared by the handshake, the dispatcher and the node.
///
/// Sending is best-effort and never fails the caller; failures are logged.
/// Receiving waits a bounded time and yields `None` when nothing usable
/// arrived, including malformed datagrams.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, msg: &Message, addr: SocketAddr);
    async fn recv(&self) -> Option<(Message, SocketAddr)>;
    fn local_addr(&self) -> SocketAddr;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, msg: &Message, addr: SocketAddr) {
        (**self).send(msg, addr).await
    }

    async fn recv(&self) -> Option<(Message, SocketAddr)> {
        (**self).recv().await
    }

    fn local_addr(&self) -> SocketAddr {
        (**self).local_addr()
    }
}

pub mod in_memory;
pub mod reliable;
pub mod udp;

pub use in_memory::InMemoryTransport;
pub use reliable::{Delivery, ReliableSender, ReliableStats};
pub use udp::UdpTransport;

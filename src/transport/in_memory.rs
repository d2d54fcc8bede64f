use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::protocol::{self, Message};
use crate::transport::Transport;

type Datagram = (Vec<u8>, SocketAddr);
type DropFilter = Box<dyn FnMut(&Message) -> bool + Send>;

/// One end of a connected in-process datagram link.
///
/// Messages travel as encoded JSON, so the codec is exercised exactly as over
/// UDP. Loss and duplication can be injected on the sending side.
pub struct InMemoryTransport {
    local: SocketAddr,
    peer: SocketAddr,
    outbox: mpsc::UnboundedSender<Datagram>,
    inbox_tx: mpsc::UnboundedSender<Datagram>,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<Datagram>>,
    recv_timeout: Duration,
    drop_filter: Mutex<Option<DropFilter>>,
    duplicate: AtomicBool,
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl InMemoryTransport {
    /// Connected pair with fake loopback addresses and a 200 ms receive wait.
    pub fn pair() -> (Self, Self) {
        Self::pair_with(
            SocketAddr::from((Ipv4Addr::LOCALHOST, 10001)),
            SocketAddr::from((Ipv4Addr::LOCALHOST, 10002)),
            Duration::from_millis(200),
        )
    }

    pub fn pair_with(a: SocketAddr, b: SocketAddr, recv_timeout: Duration) -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Self::end(a, b, b_tx.clone(), a_tx.clone(), a_rx, recv_timeout),
            Self::end(b, a, a_tx, b_tx, b_rx, recv_timeout),
        )
    }

    fn end(
        local: SocketAddr,
        peer: SocketAddr,
        outbox: mpsc::UnboundedSender<Datagram>,
        inbox_tx: mpsc::UnboundedSender<Datagram>,
        inbox: mpsc::UnboundedReceiver<Datagram>,
        recv_timeout: Duration,
    ) -> Self {
        Self {
            local,
            peer,
            outbox,
            inbox_tx,
            inbox: tokio::sync::Mutex::new(inbox),
            recv_timeout,
            drop_filter: Mutex::new(None),
            duplicate: AtomicBool::new(false),
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Drop every outgoing message for which `filter` returns `true`.
    pub fn set_drop_filter<F>(&self, filter: F)
    where
        F: FnMut(&Message) -> bool + Send + 'static,
    {
        *self.drop_filter.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(filter));
    }

    /// Deliver every outgoing message twice.
    pub fn set_duplicate(&self, duplicate: bool) {
        self.duplicate.store(duplicate, Ordering::Relaxed);
    }

    /// Place raw bytes in this end's own receive queue as if sent by `from`.
    pub fn inject_raw(&self, bytes: Vec<u8>, from: SocketAddr) {
        let _ = self.inbox_tx.send((bytes, from));
    }

    /// Messages handed to the link (after filtering, before duplication).
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn should_drop(&self, msg: &Message) -> bool {
        self.drop_filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .is_some_and(|f| f(msg))
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, msg: &Message, addr: SocketAddr) {
        if addr != self.peer {
            debug!("in-memory link has no route to {}, dropping {}", addr, msg.kind());
            return;
        }
        if self.should_drop(msg) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!("simulated loss of {}", msg.kind());
            return;
        }
        let bytes = match protocol::encode(msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("not sending {}: {}", msg.kind(), e);
                return;
            }
        };
        self.sent.fetch_add(1, Ordering::Relaxed);
        if self.duplicate.load(Ordering::Relaxed) {
            let _ = self.outbox.send((bytes.clone(), self.local));
        }
        let _ = self.outbox.send((bytes, self.local));
    }

    async fn recv(&self) -> Option<(Message, SocketAddr)> {
        let mut inbox = self.inbox.lock().await;
        let (bytes, from) = tokio::time::timeout(self.recv_timeout, inbox.recv())
            .await
            .ok()??;
        match protocol::decode(&bytes) {
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

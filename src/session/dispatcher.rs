use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::protocol::Message;
use crate::session::handshake::Handshake;
use crate::session::phase::SessionContext;
use crate::sim::{Inbound, SabotageKind};
use crate::transport::{ReliableSender, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatcherError {
    /// A dispatcher already runs in this process.
    AlreadyStarted,
    /// No session endpoint has been established yet.
    NoEndpoint,
}

impl fmt::Display for DispatcherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatcherError::AlreadyStarted => write!(f, "dispatcher already started"),
            DispatcherError::NoEndpoint => write!(f, "no session endpoint"),
        }
    }
}

impl std::error::Error for DispatcherError {}

#[derive(Debug, Default)]
pub struct DispatcherStats {
    queued: AtomicU64,
    queue_full: AtomicU64,
    foreign: AtomicU64,
    invalid: AtomicU64,
    acks: AtomicU64,
}

impl DispatcherStats {
    /// Events handed to the simulation queue.
    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    /// Events dropped because the queue was full.
    pub fn queue_full(&self) -> u64 {
        self.queue_full.load(Ordering::Relaxed)
    }

    /// Messages from an address other than the endpoint.
    pub fn foreign(&self) -> u64 {
        self.foreign.load(Ordering::Relaxed)
    }

    /// Messages with out-of-range field values.
    pub fn invalid(&self) -> u64 {
        self.invalid.load(Ordering::Relaxed)
    }

    /// `sync_frame_ack`s that matched an in-flight snapshot.
    pub fn acks(&self) -> u64 {
        self.acks.load(Ordering::Relaxed)
    }
}

/// Consumer side of the dispatcher queue, owned by the simulation.
pub struct InboundQueue {
    rx: mpsc::Receiver<Inbound>,
}

impl InboundQueue {
    /// Take every event queued so far, in arrival order.
    pub fn drain(&mut self) -> Vec<Inbound> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

pub struct DispatcherHandle {
    task: JoinHandle<()>,
    stats: Arc<DispatcherStats>,
    joined: bool,
}

impl DispatcherHandle {
    pub fn stats(&self) -> &DispatcherStats {
        &self.stats
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the task after shutdown was requested on the context.
    pub async fn join(&mut self) {
        if self.joined {
            return;
        }
        self.joined = true;
        if let Err(e) = (&mut self.task).await {
            warn!("dispatcher task failed: {}", e);
        }
    }
}

/// Routes every message from the session endpoint to where it belongs.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    ctx: Arc<SessionContext>,
    reliable: Arc<ReliableSender>,
    endpoint: SocketAddr,
    queue: mpsc::Sender<Inbound>,
    stats: Arc<DispatcherStats>,
}

impl Dispatcher {
    /// Build the dispatcher and its queue without starting a task.
    pub fn new(
        transport: Arc<dyn Transport>,
        ctx: Arc<SessionContext>,
        reliable: Arc<ReliableSender>,
        capacity: usize,
    ) -> Result<(Self, InboundQueue), DispatcherError> {
        let endpoint = ctx.endpoint().ok_or(DispatcherError::NoEndpoint)?;
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Ok((
            Self {
                transport,
                ctx,
                reliable,
                endpoint,
                queue: tx,
                stats: Arc::new(DispatcherStats::default()),
            },
            InboundQueue { rx },
        ))
    }

    /// Start the single background dispatcher for this process.
    pub fn spawn(
        transport: Arc<dyn Transport>,
        ctx: Arc<SessionContext>,
        reliable: Arc<ReliableSender>,
        capacity: usize,
    ) -> Result<(DispatcherHandle, InboundQueue), DispatcherError> {
        if ctx.endpoint().is_none() {
            return Err(DispatcherError::NoEndpoint);
        }
        if !ctx.claim_dispatcher() {
            return Err(DispatcherError::AlreadyStarted);
        }
        let (dispatcher, queue) = Self::new(transport, ctx, reliable, capacity)?;
        let stats = Arc::clone(&dispatcher.stats);
        let task = tokio::spawn(dispatcher.run());
        Ok((
            DispatcherHandle {
                task,
                stats,
                joined: false,
            },
            queue,
        ))
    }

    pub fn stats(&self) -> &DispatcherStats {
        &self.stats
    }

    async fn run(self) {
        info!("dispatcher listening for {}", self.endpoint);
        while !self.ctx.is_shutdown() {
            if let Some((msg, from)) = self.transport.recv().await {
                self.route(msg, from).await;
            }
        }
        debug!("dispatcher stopped");
    }

    /// Handle one received message.
    pub async fn route(&self, msg: Message, from: SocketAddr) {
        if from != self.endpoint {
            self.stats.foreign.fetch_add(1, Ordering::Relaxed);
            debug!("dropping {} from unknown sender {}", msg.kind(), from);
            return;
        }
        match msg {
            Message::StartGame => {
                self.ctx.peer_started();
            }
            Message::SyncFrame { frame_number, .. } => {
                self.transport
                    .send(&Message::SyncFrameAck { frame_number }, from)
                    .await;
                self.enqueue(msg);
            }
            Message::SyncFrameAck { frame_number } => {
                if self.reliable.acknowledge(frame_number) {
                    self.stats.acks.fetch_add(1, Ordering::Relaxed);
                } else {
                    debug!("ack for unknown sync frame {}", frame_number);
                }
            }
            Message::Sabotage { index } if SabotageKind::from_index(index).is_none() => {
                self.stats.invalid.fetch_add(1, Ordering::Relaxed);
                warn!("dropping sabotage with index {}", index);
            }
            Message::GameState { .. } | Message::Sabotage { .. } => self.enqueue(msg),
            Message::Request | Message::RequestAck | Message::AckAck => {
                if let Some(reply) = Handshake::late_reply(&msg, from, self.endpoint) {
                    self.transport.send(&reply, from).await;
                }
            }
        }
    }

    fn enqueue(&self, msg: Message) {
        let Ok(event) = Inbound::try_from(msg) else {
            return;
        };
        match self.queue.try_send(event) {
            Ok(()) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => {
                self.stats.queue_full.fetch_add(1, Ordering::Relaxed);
                warn!("inbound queue full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("inbound queue closed");
            }
        }
    }
}

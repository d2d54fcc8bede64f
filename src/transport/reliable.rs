//! Acknowledged delivery for grid snapshots.
//!
//! Each `sync_frame` gets its own retry task that resends on a fixed interval
//! until the matching `sync_frame_ack` is reported or the deadline passes.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::NetConfig;
use crate::protocol::Message;
use crate::transport::Transport;

/// How a reliable send ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Acknowledged,
    /// Deadline passed without an acknowledgment.
    Exhausted,
    /// Cancelled to make room for a newer snapshot, or on shutdown.
    Superseded,
}

#[derive(Debug, Default)]
pub struct ReliableStats {
    delivered: AtomicU64,
    exhausted: AtomicU64,
    superseded: AtomicU64,
}

impl ReliableStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn exhausted(&self) -> u64 {
        self.exhausted.load(Ordering::Relaxed)
    }

    pub fn superseded(&self) -> u64 {
        self.superseded.load(Ordering::Relaxed)
    }

    fn record(&self, outcome: Delivery) {
        let counter = match outcome {
            Delivery::Acknowledged => &self.delivered,
            Delivery::Exhausted => &self.exhausted,
            Delivery::Superseded => &self.superseded,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

enum Signal {
    Ack,
    Supersede,
}

type PendingTable = Arc<Mutex<BTreeMap<u64, oneshot::Sender<Signal>>>>;

/// Supervises retry tasks keyed by snapshot frame number.
pub struct ReliableSender {
    transport: Arc<dyn Transport>,
    peer: SocketAddr,
    retry_interval: Duration,
    deadline: Duration,
    max_in_flight: usize,
    pending: PendingTable,
    stats: Arc<ReliableStats>,
}

impl ReliableSender {
    pub fn new(transport: Arc<dyn Transport>, peer: SocketAddr, config: &NetConfig) -> Self {
        Self {
            transport,
            peer,
            retry_interval: config.reliable_retry_interval,
            deadline: config.reliable_deadline,
            max_in_flight: config.reliable_max_in_flight.max(1),
            pending: Arc::new(Mutex::new(BTreeMap::new())),
            stats: Arc::new(ReliableStats::default()),
        }
    }

    pub fn stats(&self) -> &ReliableStats {
        &self.stats
    }

    /// Frame numbers still awaiting acknowledgment, oldest first.
    pub fn in_flight(&self) -> Vec<u64> {
        self.table().keys().copied().collect()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, oneshot::Sender<Signal>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start delivering a `sync_frame`.
    ///
    /// Other message kinds are not acknowledged by the peer; they are sent
    /// once and `None` is returned.
    pub async fn send_reliable(&self, msg: Message) -> Option<JoinHandle<Delivery>> {
        let frame_number = match &msg {
            Message::SyncFrame { frame_number, .. } => *frame_number,
            other => {
                debug!("{} has no acknowledgment, sending once", other.kind());
                self.transport.send(other, self.peer).await;
                return None;
            }
        };

        let (tx, rx) = oneshot::channel();
        {
            let mut table = self.table();
            if let Some(previous) = table.insert(frame_number, tx) {
                let _ = previous.send(Signal::Supersede);
            }
            while table.len() > self.max_in_flight {
                if let Some((oldest, cancel)) = table.pop_first() {
                    debug!("sync frame {} superseded", oldest);
                    let _ = cancel.send(Signal::Supersede);
                }
            }
        }

        let transport = Arc::clone(&self.transport);
        let pending = Arc::clone(&self.pending);
        let stats = Arc::clone(&self.stats);
        let peer = self.peer;
        let retry_interval = self.retry_interval;
        let deadline = Instant::now() + self.deadline;

        Some(tokio::spawn(async move {
            let outcome = retry_until_acked(&*transport, &msg, peer, retry_interval, deadline, rx).await;
            if outcome == Delivery::Exhausted {
                pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&frame_number);
                warn!("sync frame {} not acknowledged, giving up", frame_number);
            }
            stats.record(outcome);
            outcome
        }))
    }

    /// Report a `sync_frame_ack`. Returns `false` for unknown or repeated acks.
    pub fn acknowledge(&self, frame_number: u64) -> bool {
        match self.table().remove(&frame_number) {
            Some(tx) => {
                let _ = tx.send(Signal::Ack);
                true
            }
            None => false,
        }
    }

    /// Stop every retry task.
    pub fn cancel_all(&self) {
        let drained = std::mem::take(&mut *self.table());
        for (_, tx) in drained {
            let _ = tx.send(Signal::Supersede);
        }
    }
}

async fn retry_until_acked(
    transport: &dyn Transport,
    msg: &Message,
    peer: SocketAddr,
    retry_interval: Duration,
    deadline: Instant,
    mut signal: oneshot::Receiver<Signal>,
) -> Delivery {
    let mut ticker = time::interval(retry_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            sig = &mut signal => {
                return match sig {
                    Ok(Signal::Ack) => Delivery::Acknowledged,
                    Ok(Signal::Supersede) | Err(_) => Delivery::Superseded,
                };
            }
            _ = time::sleep_until(deadline) => return Delivery::Exhausted,
            _ = ticker.tick() => transport.send(msg, peer).await,
        }
    }
}

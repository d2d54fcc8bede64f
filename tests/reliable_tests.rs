use std::sync::Arc;
use std::time::Duration;

use tetris_duel::protocol::Message;
use tetris_duel::session::{Dispatcher, SessionContext};
use tetris_duel::transport::{Delivery, InMemoryTransport, ReliableSender, Transport};
use tetris_duel::{Inbound, NetConfig};

fn fast() -> NetConfig {
    NetConfig {
        reliable_retry_interval: Duration::from_millis(50),
        reliable_deadline: Duration::from_millis(400),
        reliable_max_in_flight: 2,
        ..NetConfig::default()
    }
}

fn snapshot(frame_number: u64) -> Message {
    Message::SyncFrame {
        frame_number,
        grid_bitmap: vec![0; 20],
        score: 0,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn ack_completes_delivery() -> anyhow::Result<()> {
    let (a, b) = InMemoryTransport::pair();
    let a = Arc::new(a);
    let peer = b.local_addr();
    let sender = ReliableSender::new(Arc::clone(&a) as Arc<dyn Transport>, peer, &NetConfig::default());

    let handle = sender.send_reliable(snapshot(7)).await.expect("sync frames are tracked");
    let (msg, _) = b.recv().await.expect("first attempt delivered");
    assert!(matches!(msg, Message::SyncFrame { frame_number: 7, .. }));
    assert_eq!(sender.in_flight(), vec![7]);

    assert!(sender.acknowledge(7));
    assert_eq!(handle.await?, Delivery::Acknowledged);
    assert!(!sender.acknowledge(7));
    assert!(sender.in_flight().is_empty());
    assert_eq!(sender.stats().delivered(), 1);
    assert_eq!(a.sent_count(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unacknowledged_snapshot_is_retried_then_abandoned() -> anyhow::Result<()> {
    let (a, b) = InMemoryTransport::pair();
    let a = Arc::new(a);
    let sender = ReliableSender::new(Arc::clone(&a) as Arc<dyn Transport>, b.local_addr(), &fast());

    let handle = sender.send_reliable(snapshot(3)).await.expect("sync frames are tracked");
    assert_eq!(handle.await?, Delivery::Exhausted);
    assert!(a.sent_count() >= 3);
    assert!(sender.in_flight().is_empty());
    assert_eq!(sender.stats().exhausted(), 1);
    assert!(!sender.acknowledge(3));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn oldest_snapshot_is_superseded() -> anyhow::Result<()> {
    let (a, b) = InMemoryTransport::pair();
    let sender = ReliableSender::new(Arc::new(a), b.local_addr(), &fast());

    let first = sender.send_reliable(snapshot(1)).await.expect("tracked");
    let second = sender.send_reliable(snapshot(2)).await.expect("tracked");
    let third = sender.send_reliable(snapshot(3)).await.expect("tracked");

    assert_eq!(first.await?, Delivery::Superseded);
    assert_eq!(sender.in_flight(), vec![2, 3]);

    sender.cancel_all();
    assert_eq!(second.await?, Delivery::Superseded);
    assert_eq!(third.await?, Delivery::Superseded);
    assert_eq!(sender.stats().superseded(), 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn other_messages_are_sent_once() -> anyhow::Result<()> {
    let (a, b) = InMemoryTransport::pair();
    let sender = ReliableSender::new(Arc::new(a), b.local_addr(), &fast());
    assert!(sender.send_reliable(Message::Sabotage { index: 2 }).await.is_none());
    let (msg, _) = b.recv().await.expect("delivered");
    assert_eq!(msg, Message::Sabotage { index: 2 });
    assert!(b.recv().await.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatchers_ack_snapshots_end_to_end() -> anyhow::Result<()> {
    let (a, b) = InMemoryTransport::pair();
    let (addr_a, addr_b) = (a.local_addr(), b.local_addr());
    let ta: Arc<dyn Transport> = Arc::new(a);
    let tb: Arc<dyn Transport> = Arc::new(b);

    let ctx_a = Arc::new(SessionContext::new());
    ctx_a.set_endpoint(addr_b);
    let ctx_b = Arc::new(SessionContext::new());
    ctx_b.set_endpoint(addr_a);

    let reliable_a = Arc::new(ReliableSender::new(Arc::clone(&ta), addr_b, &fast()));
    let reliable_b = Arc::new(ReliableSender::new(Arc::clone(&tb), addr_a, &fast()));
    let (mut da, _qa) = Dispatcher::spawn(Arc::clone(&ta), Arc::clone(&ctx_a), Arc::clone(&reliable_a), 16)?;
    let (mut db, mut qb) = Dispatcher::spawn(tb, Arc::clone(&ctx_b), reliable_b, 16)?;

    let handle = reliable_a.send_reliable(snapshot(7)).await.expect("tracked");
    assert_eq!(handle.await?, Delivery::Acknowledged);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let events = qb.drain();
    assert!(!events.is_empty());
    assert!(events
        .iter()
        .all(|e| matches!(e, Inbound::SyncFrame { frame_number: 7, .. })));

    ctx_a.request_shutdown();
    ctx_b.request_shutdown();
    da.join().await;
    db.join().await;
    assert!(da.is_finished() && db.is_finished());
    assert_eq!(da.stats().acks(), 1);
    Ok(())
}

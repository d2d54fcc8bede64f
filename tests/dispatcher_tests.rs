use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tetris_duel::protocol::Message;
use tetris_duel::session::{Dispatcher, DispatcherError, InboundQueue, SessionContext, SessionPhase};
use tetris_duel::transport::{InMemoryTransport, ReliableSender, Transport};
use tetris_duel::{Inbound, NetConfig};

struct Rig {
    dispatcher: Dispatcher,
    queue: InboundQueue,
    ctx: Arc<SessionContext>,
    remote: InMemoryTransport,
    endpoint: SocketAddr,
}

fn rig(capacity: usize) -> Rig {
    let (local, remote) = InMemoryTransport::pair();
    let endpoint = remote.local_addr();
    let transport: Arc<dyn Transport> = Arc::new(local);
    let ctx = Arc::new(SessionContext::new());
    ctx.set_endpoint(endpoint);
    let reliable = Arc::new(ReliableSender::new(Arc::clone(&transport), endpoint, &NetConfig::default()));
    let (dispatcher, queue) = Dispatcher::new(transport, Arc::clone(&ctx), reliable, capacity).unwrap();
    Rig {
        dispatcher,
        queue,
        ctx,
        remote,
        endpoint,
    }
}

fn game_state(frame_number: u64) -> Message {
    Message::GameState {
        frame_number,
        piece_coordinates: vec![(4, 19)],
        next_shape: 1,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn gameplay_messages_are_queued_in_order() -> anyhow::Result<()> {
    let mut rig = rig(16);
    rig.dispatcher.route(game_state(1), rig.endpoint).await;
    rig.dispatcher.route(Message::Sabotage { index: 0 }, rig.endpoint).await;

    let events = rig.queue.drain();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Inbound::GameState { frame_number: 1, .. }));
    assert_eq!(events[1], Inbound::Sabotage { index: 0 });
    assert_eq!(rig.dispatcher.stats().queued(), 2);
    assert!(rig.queue.drain().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn foreign_senders_are_ignored() -> anyhow::Result<()> {
    let mut rig = rig(16);
    let stranger = SocketAddr::from((Ipv4Addr::new(10, 9, 9, 9), 5000));
    rig.dispatcher.route(game_state(1), stranger).await;
    rig.dispatcher.route(Message::StartGame, stranger).await;
    assert!(rig.queue.drain().is_empty());
    assert_eq!(rig.dispatcher.stats().foreign(), 2);
    assert_eq!(rig.ctx.phase(), SessionPhase::Idle);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn out_of_range_sabotage_is_dropped() -> anyhow::Result<()> {
    let mut rig = rig(16);
    rig.dispatcher.route(Message::Sabotage { index: 3 }, rig.endpoint).await;
    assert!(rig.queue.drain().is_empty());
    assert_eq!(rig.dispatcher.stats().invalid(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn snapshot_is_acknowledged_and_queued() -> anyhow::Result<()> {
    let mut rig = rig(16);
    let sync = Message::SyncFrame {
        frame_number: 4,
        grid_bitmap: vec![0; 20],
        score: 40,
    };
    rig.dispatcher.route(sync, rig.endpoint).await;

    let (reply, _) = rig.remote.recv().await.expect("ack sent");
    assert_eq!(reply, Message::SyncFrameAck { frame_number: 4 });
    assert!(matches!(rig.queue.drain().as_slice(), [Inbound::SyncFrame { frame_number: 4, score: 40, .. }]));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn start_game_moves_match_found_to_countdown() -> anyhow::Result<()> {
    let rig = rig(16);
    rig.dispatcher.route(Message::StartGame, rig.endpoint).await;
    assert_eq!(rig.ctx.phase(), SessionPhase::Idle);

    rig.ctx.transition(SessionPhase::Idle, SessionPhase::MatchFound)?;
    rig.dispatcher.route(Message::StartGame, rig.endpoint).await;
    assert_eq!(rig.ctx.phase(), SessionPhase::Countdown);

    rig.dispatcher.route(Message::StartGame, rig.endpoint).await;
    assert_eq!(rig.ctx.phase(), SessionPhase::Countdown);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn start_game_before_match_found_is_applied_on_entry() -> anyhow::Result<()> {
    let (local, remote) = InMemoryTransport::pair();
    let endpoint = remote.local_addr();
    let transport: Arc<dyn Transport> = Arc::new(local);
    let ctx = Arc::new(SessionContext::new());
    ctx.set_endpoint(endpoint);
    ctx.transition(SessionPhase::Idle, SessionPhase::MatchmakingInProgress)?;

    remote.send(&Message::StartGame, remote.peer_addr()).await;
    let reliable = Arc::new(ReliableSender::new(Arc::clone(&transport), endpoint, &NetConfig::default()));
    let (mut handle, _queue) = Dispatcher::spawn(transport, Arc::clone(&ctx), reliable, 16)?;

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(ctx.phase(), SessionPhase::MatchmakingInProgress);
    ctx.transition(SessionPhase::MatchmakingInProgress, SessionPhase::MatchFound)?;
    assert_eq!(ctx.phase(), SessionPhase::Countdown);

    ctx.request_shutdown();
    handle.join().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn late_request_is_answered() -> anyhow::Result<()> {
    let rig = rig(16);
    rig.dispatcher.route(Message::Request, rig.endpoint).await;
    let (reply, _) = rig.remote.recv().await.expect("reply sent");
    assert_eq!(reply, Message::RequestAck);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn full_queue_drops_newest() -> anyhow::Result<()> {
    let mut rig = rig(1);
    rig.dispatcher.route(game_state(1), rig.endpoint).await;
    rig.dispatcher.route(game_state(2), rig.endpoint).await;
    assert_eq!(rig.dispatcher.stats().queue_full(), 1);
    let events = rig.queue.drain();
    assert!(matches!(events.as_slice(), [Inbound::GameState { frame_number: 1, .. }]));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_datagrams_do_not_stop_the_dispatcher() -> anyhow::Result<()> {
    let (local, remote) = InMemoryTransport::pair();
    let endpoint = remote.local_addr();
    local.inject_raw(b"{\"type\":\"game_state\"".to_vec(), endpoint);
    local.inject_raw(vec![0xff, 0x00, 0x13], endpoint);

    let transport: Arc<dyn Transport> = Arc::new(local);
    let ctx = Arc::new(SessionContext::new());
    ctx.set_endpoint(endpoint);
    let reliable = Arc::new(ReliableSender::new(Arc::clone(&transport), endpoint, &NetConfig::default()));
    let (mut handle, mut queue) = Dispatcher::spawn(transport, Arc::clone(&ctx), reliable, 16)?;

    remote.send(&game_state(1), remote.peer_addr()).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let events = queue.drain();
    assert!(matches!(events.as_slice(), [Inbound::GameState { frame_number: 1, .. }]));

    ctx.request_shutdown();
    handle.join().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn only_one_dispatcher_per_context() -> anyhow::Result<()> {
    let (local, remote) = InMemoryTransport::pair();
    let transport: Arc<dyn Transport> = Arc::new(local);
    let ctx = Arc::new(SessionContext::new());
    let reliable = Arc::new(ReliableSender::new(Arc::clone(&transport), remote.local_addr(), &NetConfig::default()));

    let early = Dispatcher::spawn(Arc::clone(&transport), Arc::clone(&ctx), Arc::clone(&reliable), 16);
    assert!(matches!(early, Err(DispatcherError::NoEndpoint)));

    ctx.set_endpoint(remote.local_addr());
    let (mut first, _queue) = Dispatcher::spawn(Arc::clone(&transport), Arc::clone(&ctx), Arc::clone(&reliable), 16)?;
    let second = Dispatcher::spawn(transport, Arc::clone(&ctx), reliable, 16);
    assert!(matches!(second, Err(DispatcherError::AlreadyStarted)));
    assert!(ctx.dispatcher_started());

    ctx.request_shutdown();
    first.join().await;
    Ok(())
}

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tetris_duel::protocol::Message;
use tetris_duel::session::{
    parse_peer, run_handshake, Dispatcher, Handshake, HandshakeError, SessionContext,
    SessionPhase,
};
use tetris_duel::transport::{InMemoryTransport, ReliableSender, Transport};
use tetris_duel::NetConfig;

fn fast() -> NetConfig {
    NetConfig {
        request_interval: Duration::from_millis(50),
        handshake_deadline: Duration::from_secs(3),
        recv_timeout: Duration::from_millis(50),
        ..NetConfig::default()
    }
}

fn pair() -> (Arc<InMemoryTransport>, Arc<InMemoryTransport>) {
    let (a, b) = InMemoryTransport::pair_with(
        SocketAddr::from((Ipv4Addr::LOCALHOST, 20001)),
        SocketAddr::from((Ipv4Addr::LOCALHOST, 20002)),
        Duration::from_millis(50),
    );
    (Arc::new(a), Arc::new(b))
}

async fn both(
    a: Arc<InMemoryTransport>,
    b: Arc<InMemoryTransport>,
) -> anyhow::Result<(SocketAddr, SocketAddr)> {
    let (a_peer, b_peer) = (b.local_addr(), a.local_addr());
    let ha = tokio::spawn(run_handshake(a, a_peer, fast(), Arc::new(SessionContext::new())));
    let hb = tokio::spawn(run_handshake(b, b_peer, fast(), Arc::new(SessionContext::new())));
    Ok((ha.await??, hb.await??))
}

#[tokio::test(flavor = "multi_thread")]
async fn simultaneous_initiation_converges() -> anyhow::Result<()> {
    let (a, b) = pair();
    let (addr_a, addr_b) = (a.local_addr(), b.local_addr());
    let (seen_by_a, seen_by_b) = both(a, b).await?;
    assert_eq!(seen_by_a, addr_b);
    assert_eq!(seen_by_b, addr_a);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn converges_despite_lost_requests() -> anyhow::Result<()> {
    let (a, b) = pair();
    let lost = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&lost);
    a.set_drop_filter(move |msg| {
        matches!(msg, Message::Request) && counter.fetch_add(1, Ordering::Relaxed) < 3
    });
    b.set_drop_filter(|msg| matches!(msg, Message::RequestAck));

    let (addr_a, addr_b) = (a.local_addr(), b.local_addr());
    let (seen_by_a, seen_by_b) = both(Arc::clone(&a), b).await?;
    assert_eq!(seen_by_a, addr_b);
    assert_eq!(seen_by_b, addr_a);
    assert!(a.dropped_count() >= 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn converges_despite_duplication() -> anyhow::Result<()> {
    let (a, b) = pair();
    a.set_duplicate(true);
    b.set_duplicate(true);
    let (addr_a, addr_b) = (a.local_addr(), b.local_addr());
    let (seen_by_a, seen_by_b) = both(a, b).await?;
    assert_eq!(seen_by_a, addr_b);
    assert_eq!(seen_by_b, addr_a);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn lost_ack_ack_is_recovered_by_dispatcher() -> anyhow::Result<()> {
    let (a, b) = pair();
    a.set_drop_filter(|msg| matches!(msg, Message::AckAck));
    let (addr_a, addr_b) = (a.local_addr(), b.local_addr());

    let ta: Arc<dyn Transport> = a;
    let hb = tokio::spawn(run_handshake(
        Arc::clone(&b) as Arc<dyn Transport>,
        addr_a,
        fast(),
        Arc::new(SessionContext::new()),
    ));
    let ctx = Arc::new(SessionContext::new());
    let established = run_handshake(Arc::clone(&ta), addr_b, fast(), Arc::clone(&ctx)).await?;
    assert_eq!(established, addr_b);

    ctx.set_endpoint(established);
    let reliable = Arc::new(ReliableSender::new(Arc::clone(&ta), established, &fast()));
    let (mut dispatcher, _queue) = Dispatcher::spawn(Arc::clone(&ta), Arc::clone(&ctx), reliable, 16)?;

    assert_eq!(hb.await??, addr_a);

    ctx.request_shutdown();
    dispatcher.join().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn start_game_during_matchmaking_is_kept() -> anyhow::Result<()> {
    // The peer finished its handshake and started while ours still runs.
    let (a, b) = pair();
    let (addr_a, addr_b) = (a.local_addr(), b.local_addr());
    a.send(&Message::StartGame, addr_b).await;

    let ctx = Arc::new(SessionContext::new());
    ctx.transition(SessionPhase::Idle, SessionPhase::MatchmakingInProgress)?;
    let established = run_handshake(b, addr_a, fast(), Arc::clone(&ctx)).await?;
    assert_eq!(established, addr_a);
    assert!(ctx.start_pending());
    assert_eq!(ctx.phase(), SessionPhase::MatchmakingInProgress);

    ctx.transition(SessionPhase::MatchmakingInProgress, SessionPhase::MatchFound)?;
    assert_eq!(ctx.phase(), SessionPhase::Countdown);
    assert!(!ctx.start_pending());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn silent_peer_times_out() -> anyhow::Result<()> {
    let (a, b) = pair();
    let config = NetConfig {
        handshake_deadline: Duration::from_millis(300),
        ..fast()
    };
    let result = run_handshake(a, b.local_addr(), config, Arc::new(SessionContext::new())).await;
    assert_eq!(result, Err(HandshakeError::Timeout));
    Ok(())
}

#[test]
fn state_machine_replies() {
    let peer = SocketAddr::from((Ipv4Addr::LOCALHOST, 5000));
    let mut hs = Handshake::new(peer);

    let r = hs.on_message(&Message::Request, peer);
    assert_eq!(r.reply, Some((Message::RequestAck, peer)));
    assert_eq!(r.established, None);

    let r = hs.on_message(&Message::RequestAck, peer);
    assert_eq!(r.reply, Some((Message::AckAck, peer)));
    assert_eq!(r.established, Some(peer));

    let r = hs.on_message(&Message::AckAck, peer);
    assert_eq!(r.established, None);
    assert_eq!(hs.established(), Some(peer));

    let r = hs.on_message(&Message::StartGame, peer);
    assert_eq!(r.reply, None);
    assert!(!r.started);
}

#[test]
fn start_game_establishes_and_reports_start() {
    let peer = SocketAddr::from((Ipv4Addr::LOCALHOST, 5000));
    let stranger = SocketAddr::from((Ipv4Addr::LOCALHOST, 5001));
    let mut hs = Handshake::new(peer);

    let r = hs.on_message(&Message::StartGame, stranger);
    assert_eq!(r.established, None);
    assert!(!r.started);

    let r = hs.on_message(&Message::StartGame, peer);
    assert_eq!(r.reply, None);
    assert_eq!(r.established, Some(peer));
    assert!(r.started);
}

#[test]
fn ack_ack_establishes_responder() {
    let peer = SocketAddr::from((Ipv4Addr::LOCALHOST, 5000));
    let mut hs = Handshake::new(peer);
    let r = hs.on_message(&Message::AckAck, peer);
    assert_eq!(r.reply, None);
    assert_eq!(r.established, Some(peer));
}

#[test]
fn late_replies_only_to_endpoint() {
    let endpoint = SocketAddr::from((Ipv4Addr::LOCALHOST, 5000));
    let stranger = SocketAddr::from((Ipv4Addr::LOCALHOST, 5001));
    assert_eq!(
        Handshake::late_reply(&Message::Request, endpoint, endpoint),
        Some(Message::RequestAck)
    );
    assert_eq!(
        Handshake::late_reply(&Message::RequestAck, endpoint, endpoint),
        Some(Message::AckAck)
    );
    assert_eq!(Handshake::late_reply(&Message::AckAck, endpoint, endpoint), None);
    assert_eq!(Handshake::late_reply(&Message::Request, stranger, endpoint), None);
}

#[test]
fn peer_addresses() {
    assert_eq!(
        parse_peer("192.168.1.20", 5000).unwrap(),
        SocketAddr::from(([192, 168, 1, 20], 5000))
    );
    assert_eq!(
        parse_peer(" 10.0.0.2:6000 ", 5000).unwrap(),
        SocketAddr::from(([10, 0, 0, 2], 6000))
    );
    assert!(matches!(parse_peer("10.0.0.2:70000", 5000), Err(HandshakeError::InvalidPeer(_))));
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::NetConfig;
use crate::player::Input;
use crate::protocol::Message;
use crate::render::{FrameView, NullRender, RenderSink};
use crate::scores::{self, HighScoreEntry, HighScoreStore, MemoryStore};
use crate::session::dispatcher::{Dispatcher, DispatcherHandle, InboundQueue};
use crate::session::handshake::{run_handshake, HandshakeError};
use crate::session::phase::{SessionContext, SessionPhase};
use crate::sim::{GameEngine, GameOverEvent, TickOutcome, HIGH_SCORE_SLOTS};
use crate::transport::{ReliableSender, Transport};

/// Behaviour switches for unattended runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeOptions {
    /// Act as if confirm were pressed whenever the phase waits for it.
    pub auto_confirm: bool,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
    /// Stop once this many matches have been played through the leaderboard.
    pub max_matches: Option<u32>,
}

/// Summary returned when the node stops.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub frames: u64,
    pub phase: String,
    pub matches: u32,
    pub final_scores: Vec<u64>,
    pub score: u64,
    pub opponent_score: u64,
    pub pieces_locked: u64,
    pub syncs_sent: u64,
    pub syncs_acked: u64,
    pub syncs_exhausted: u64,
    pub events_received: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Frame-locked driver for one player: input, session phases, simulation,
/// outbound traffic and rendering.
pub struct PeerNode {
    transport: Arc<dyn Transport>,
    ctx: Arc<SessionContext>,
    net: NetConfig,
    peer: SocketAddr,
    engine: GameEngine,
    input: mpsc::Receiver<Input>,
    render: Box<dyn RenderSink>,
    scores: Box<dyn HighScoreStore>,
    options: NodeOptions,
    handshake: Option<JoinHandle<Result<SocketAddr, HandshakeError>>>,
    dispatcher: Option<DispatcherHandle>,
    inbound: Option<InboundQueue>,
    reliable: Option<Arc<ReliableSender>>,
    countdown_started: Option<Duration>,
    leaderboard: Vec<HighScoreEntry>,
    frame: u64,
    matches: u32,
    final_scores: Vec<u64>,
}

impl PeerNode {
    pub fn new(
        transport: Arc<dyn Transport>,
        peer: SocketAddr,
        net: NetConfig,
        engine: GameEngine,
        input: mpsc::Receiver<Input>,
    ) -> Self {
        Self {
            transport,
            ctx: Arc::new(SessionContext::new()),
            net,
            peer,
            engine,
            input,
            render: Box::new(NullRender),
            scores: Box::new(MemoryStore::new()),
            options: NodeOptions::default(),
            handshake: None,
            dispatcher: None,
            inbound: None,
            reliable: None,
            countdown_started: None,
            leaderboard: Vec::new(),
            frame: 0,
            matches: 0,
            final_scores: Vec::new(),
        }
    }

    pub fn with_render(mut self, render: Box<dyn RenderSink>) -> Self {
        self.render = render;
        self
    }

    pub fn with_scores(mut self, scores: Box<dyn HighScoreStore>) -> Self {
        self.scores = scores;
        self
    }

    pub fn with_options(mut self, options: NodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_context(mut self, ctx: Arc<SessionContext>) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    /// Run the frame loop until quit or a configured limit is reached.
    pub async fn run(mut self) -> anyhow::Result<NodeReport> {
        let start = Instant::now();
        let mut ticker = time::interval(self.net.frame_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if self.step(start.elapsed()).await? == Flow::Stop {
                break;
            }
        }
        self.shutdown().await;
        Ok(self.report())
    }

    async fn step(&mut self, now: Duration) -> anyhow::Result<Flow> {
        self.frame += 1;

        while let Ok(input) = self.input.try_recv() {
            match input {
                Input::Quit => {
                    info!("quit requested");
                    return Ok(Flow::Stop);
                }
                Input::Confirm => self.confirm().await,
                Input::Action(action) => {
                    if matches!(self.ctx.phase(), SessionPhase::Playing | SessionPhase::GameOver) {
                        self.engine.push_action(action);
                    }
                }
            }
        }

        self.poll_handshake().await;

        let mut flow = Flow::Continue;
        match self.ctx.phase() {
            SessionPhase::Idle | SessionPhase::MatchmakingFailed | SessionPhase::MatchFound
                if self.options.auto_confirm =>
            {
                self.confirm().await
            }
            SessionPhase::Countdown => self.countdown_frame(now),
            SessionPhase::Playing => self.play_frame(now).await,
            SessionPhase::GameOver => flow = self.post_game_frame(now).await,
            _ => {}
        }

        self.present(now);

        if self.options.max_frames.is_some_and(|max| self.frame >= max) {
            flow = Flow::Stop;
        }
        Ok(flow)
    }

    /// React to the confirm control in the current phase.
    async fn confirm(&mut self) {
        match self.ctx.phase() {
            SessionPhase::Idle if self.ctx.endpoint().is_some() => {
                let _ = self.ctx.transition(SessionPhase::Idle, SessionPhase::MatchFound);
            }
            SessionPhase::Idle => {
                if self
                    .ctx
                    .transition(SessionPhase::Idle, SessionPhase::MatchmakingInProgress)
                    .is_ok()
                {
                    self.start_handshake();
                }
            }
            SessionPhase::MatchmakingFailed => {
                if self
                    .ctx
                    .transition(SessionPhase::MatchmakingFailed, SessionPhase::MatchmakingInProgress)
                    .is_ok()
                {
                    self.start_handshake();
                }
            }
            SessionPhase::MatchFound => {
                if let Some(endpoint) = self.ctx.endpoint() {
                    self.transport.send(&Message::StartGame, endpoint).await;
                }
                if let Err(e) = self
                    .ctx
                    .transition(SessionPhase::MatchFound, SessionPhase::Countdown)
                {
                    debug!("start not applied: {}", e);
                }
            }
            _ => {}
        }
    }

    fn start_handshake(&mut self) {
        if self.handshake.is_some() {
            return;
        }
        let transport = Arc::clone(&self.transport);
        let ctx = Arc::clone(&self.ctx);
        self.handshake = Some(tokio::spawn(run_handshake(
            transport, self.peer, self.net, ctx,
        )));
    }

    async fn poll_handshake(&mut self) {
        let Some(handle) = self.handshake.take() else {
            return;
        };
        if !handle.is_finished() {
            self.handshake = Some(handle);
            return;
        }
        match handle.await {
            Ok(Ok(addr)) => self.on_established(addr),
            Ok(Err(e)) => {
                warn!("matchmaking failed: {}", e);
                let _ = self.ctx.transition(
                    SessionPhase::MatchmakingInProgress,
                    SessionPhase::MatchmakingFailed,
                );
            }
            Err(e) => {
                warn!("handshake task failed: {}", e);
                let _ = self.ctx.transition(
                    SessionPhase::MatchmakingInProgress,
                    SessionPhase::MatchmakingFailed,
                );
            }
        }
    }

    fn on_established(&mut self, addr: SocketAddr) {
        let endpoint = self.ctx.set_endpoint(addr);
        if endpoint != addr {
            warn!("keeping endpoint {} over {}", endpoint, addr);
        }
        // Enter MatchFound before the dispatcher can read a peer start_game.
        let _ = self
            .ctx
            .transition(SessionPhase::MatchmakingInProgress, SessionPhase::MatchFound);
        if self.dispatcher.is_none() {
            let reliable = Arc::new(ReliableSender::new(
                Arc::clone(&self.transport),
                endpoint,
                &self.net,
            ));
            match Dispatcher::spawn(
                Arc::clone(&self.transport),
                Arc::clone(&self.ctx),
                Arc::clone(&reliable),
                self.net.inbound_capacity,
            ) {
                Ok((handle, queue)) => {
                    self.dispatcher = Some(handle);
                    self.inbound = Some(queue);
                    self.reliable = Some(reliable);
                }
                Err(e) => warn!("dispatcher not started: {}", e),
            }
        }
    }

    fn countdown_frame(&mut self, now: Duration) {
        let started = *self.countdown_started.get_or_insert(now);
        if now.saturating_sub(started) < self.net.countdown {
            return;
        }
        self.countdown_started = None;
        if self
            .ctx
            .transition(SessionPhase::Countdown, SessionPhase::Playing)
            .is_ok()
        {
            self.engine.restart(now);
        }
    }

    fn drain_inbound(&mut self) -> Vec<crate::sim::Inbound> {
        self.inbound
            .as_mut()
            .map(InboundQueue::drain)
            .unwrap_or_default()
    }

    async fn play_frame(&mut self, now: Duration) {
        let inbound = self.drain_inbound();
        let outcome = self.engine.tick(now, inbound);
        self.flush_outbound().await;

        if let TickOutcome::GameOver { final_score } = outcome {
            info!("game over, final score {}", final_score);
            let _ = self
                .ctx
                .transition(SessionPhase::Playing, SessionPhase::GameOver);
            self.leaderboard = self.scores.load_top(HIGH_SCORE_SLOTS);
            let qualifies = scores::qualifies(&self.leaderboard, final_score);
            self.engine.enter_post_game(qualifies);
            self.matches += 1;
            self.final_scores.push(final_score);
        }
    }

    async fn post_game_frame(&mut self, now: Duration) -> Flow {
        let inbound = self.drain_inbound();
        self.engine.tick(now, inbound);
        self.flush_outbound().await;

        let mut flow = Flow::Continue;
        for event in self.engine.take_post_game_events() {
            match event {
                GameOverEvent::InitialsEntered(initials) => {
                    let entry = HighScoreEntry::now(self.engine.score(), initials);
                    match scores::record(self.scores.as_mut(), entry) {
                        Ok(entries) => self.leaderboard = entries,
                        Err(e) => warn!("high score not saved: {}", e),
                    }
                }
                GameOverEvent::RestartRequested => {
                    let _ = self
                        .ctx
                        .transition(SessionPhase::GameOver, SessionPhase::Idle);
                    if self.options.max_matches.is_some_and(|max| self.matches >= max) {
                        flow = Flow::Stop;
                    }
                }
            }
        }
        flow
    }

    async fn flush_outbound(&mut self) {
        let outbound = self.engine.take_outbound();
        let Some(endpoint) = self.ctx.endpoint() else {
            return;
        };
        for event in outbound {
            let msg = Message::from(event);
            match (&msg, self.reliable.as_ref()) {
                (Message::SyncFrame { .. }, Some(reliable)) => {
                    let _ = reliable.send_reliable(msg).await;
                }
                _ => self.transport.send(&msg, endpoint).await,
            }
        }
    }

    fn present(&mut self, now: Duration) {
        let phase = self.ctx.phase();
        let countdown = match (phase, self.countdown_started) {
            (SessionPhase::Countdown, Some(started)) => {
                let left = self.net.countdown.saturating_sub(now.saturating_sub(started));
                Some(left.as_millis().div_ceil(1000) as u64)
            }
            _ => None,
        };
        let view = FrameView {
            frame: self.frame,
            phase,
            engine: &self.engine,
            countdown,
            leaderboard: &self.leaderboard,
        };
        self.render.present(&view);
    }

    async fn shutdown(&mut self) {
        self.ctx.request_shutdown();
        if let Some(handshake) = self.handshake.take() {
            handshake.abort();
        }
        if let Some(reliable) = self.reliable.as_ref() {
            reliable.cancel_all();
        }
        if let Some(dispatcher) = self.dispatcher.as_mut() {
            dispatcher.join().await;
        }
    }

    fn report(&self) -> NodeReport {
        let (syncs_acked, syncs_exhausted) = self
            .reliable
            .as_ref()
            .map_or((0, 0), |r| (r.stats().delivered(), r.stats().exhausted()));
        NodeReport {
            frames: self.frame,
            phase: format!("{:?}", self.ctx.phase()),
            matches: self.matches,
            final_scores: self.final_scores.clone(),
            score: self.engine.score(),
            opponent_score: self.engine.mirror().score(),
            pieces_locked: self.engine.frame_number(),
            syncs_sent: self.engine.sync_frame_number(),
            syncs_acked,
            syncs_exhausted,
            events_received: self.dispatcher.as_ref().map_or(0, |d| d.stats().queued()),
        }
    }
}

/// Play two bot-driven nodes against each other over an in-memory link.
///
/// Each node stops after `frames` frames; seeds make the run reproducible.
pub async fn run_local_match(
    seeds: (u64, u64),
    frames: u64,
    net: NetConfig,
) -> anyhow::Result<(NodeReport, NodeReport)> {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use crate::config::INPUT_CHANNEL_CAPACITY;
    use crate::player::{spawn_input, AutoInput};
    use crate::sim::EngineConfig;
    use crate::transport::InMemoryTransport;

    let (t1, t2) = InMemoryTransport::pair();
    let (addr1, addr2) = (t1.local_addr(), t2.local_addr());
    let options = NodeOptions {
        auto_confirm: true,
        max_frames: Some(frames),
        max_matches: None,
    };

    let build = |transport: InMemoryTransport, peer: SocketAddr, seed: u64| -> anyhow::Result<PeerNode> {
        let engine = GameEngine::new(EngineConfig::default(), seed)?;
        let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let bot = AutoInput::new(SmallRng::seed_from_u64(seed ^ 0x5eed), net.frame_period * 8);
        let _ = spawn_input(Box::new(bot), tx);
        Ok(PeerNode::new(Arc::new(transport), peer, net, engine, rx).with_options(options))
    };

    let node1 = build(t1, addr2, seeds.0)?;
    let node2 = build(t2, addr1, seeds.1)?;
    let (r1, r2) = tokio::try_join!(node1.run(), node2.run())?;
    Ok((r1, r2))
}

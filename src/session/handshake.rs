//! Three-way session establishment over an unreliable link.
//!
//! Either side may initiate and both may do so at once: `request` is answered
//! with `request_ack`, `request_ack` with `ack_ack`, and a peer is established
//! on receiving either of the latter two. A `start_game` from the peer also
//! establishes, since the peer only sends it once it has a session with us.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::time::{self, Instant};

use crate::config::NetConfig;
use crate::protocol::Message;
use crate::session::phase::SessionContext;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// No peer answered before the deadline.
    Timeout,
    /// The configured peer address could not be parsed.
    InvalidPeer(String),
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::Timeout => write!(f, "matchmaking timed out"),
            HandshakeError::InvalidPeer(addr) => write!(f, "invalid peer address: {}", addr),
        }
    }
}

impl std::error::Error for HandshakeError {}

/// Parse `host[:port]`, using `default_port` when none is given.
pub fn parse_peer(addr: &str, default_port: u16) -> Result<SocketAddr, HandshakeError> {
    let addr = addr.trim();
    if let Ok(sock) = addr.parse::<SocketAddr>() {
        return Ok(sock);
    }
    if let Ok(ip) = addr.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }
    let with_port = if addr.contains(':') {
        addr.to_string()
    } else {
        format!("{}:{}", addr, default_port)
    };
    with_port
        .to_socket_addrs()
        .ok()
        .and_then(|mut it| it.find(SocketAddr::is_ipv4))
        .ok_or_else(|| HandshakeError::InvalidPeer(addr.to_string()))
}

/// What the driver must do after feeding a message to [`Handshake`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    pub reply: Option<(Message, SocketAddr)>,
    pub established: Option<SocketAddr>,
    /// The peer has already started the match.
    pub started: bool,
}

/// Pure handshake state.
#[derive(Debug, Clone)]
pub struct Handshake {
    peer: SocketAddr,
    established: Option<SocketAddr>,
}

impl Handshake {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            established: None,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn established(&self) -> Option<SocketAddr> {
        self.established
    }

    pub fn on_message(&mut self, msg: &Message, from: SocketAddr) -> Reaction {
        match msg {
            Message::Request => Reaction {
                reply: Some((Message::RequestAck, from)),
                ..Reaction::default()
            },
            Message::RequestAck if self.established.is_none() => {
                self.established = Some(from);
                Reaction {
                    reply: Some((Message::AckAck, from)),
                    established: Some(from),
                    started: false,
                }
            }
            Message::AckAck if self.established.is_none() => {
                self.established = Some(from);
                Reaction {
                    reply: None,
                    established: Some(from),
                    started: false,
                }
            }
            Message::StartGame if self.established.is_none() && from == self.peer => {
                self.established = Some(from);
                Reaction {
                    reply: None,
                    established: Some(from),
                    started: true,
                }
            }
            Message::RequestAck | Message::AckAck => Reaction::default(),
            other => {
                debug!("ignoring {} from {} during handshake", other.kind(), from);
                Reaction::default()
            }
        }
    }

    /// Reply to handshake traffic arriving after establishment, so a peer that
    /// missed our `ack_ack` still converges. Only the endpoint is answered.
    pub fn late_reply(msg: &Message, from: SocketAddr, endpoint: SocketAddr) -> Option<Message> {
        if from != endpoint {
            return None;
        }
        match msg {
            Message::Request => Some(Message::RequestAck),
            Message::RequestAck => Some(Message::AckAck),
            _ => None,
        }
    }
}

/// Run matchmaking against `peer` until established or the deadline passes.
///
/// A `start_game` consumed here is handed to `ctx` so it survives until the
/// session reaches `MatchFound`.
pub async fn run_handshake(
    transport: Arc<dyn Transport>,
    peer: SocketAddr,
    config: NetConfig,
    ctx: Arc<SessionContext>,
) -> Result<SocketAddr, HandshakeError> {
    let mut handshake = Handshake::new(peer);
    let deadline = Instant::now() + config.handshake_deadline;
    let mut next_request = Instant::now();
    info!("matchmaking with {}", peer);

    loop {
        let now = Instant::now();
        if now >= deadline {
            warn!("no answer from {} within {:?}", peer, config.handshake_deadline);
            return Err(HandshakeError::Timeout);
        }
        if now >= next_request {
            transport.send(&Message::Request, peer).await;
            next_request = now + config.request_interval;
        }

        let wake = next_request.min(deadline);
        let Ok(Some((msg, from))) = time::timeout_at(wake, transport.recv()).await else {
            continue;
        };
        let reaction = handshake.on_message(&msg, from);
        if let Some((reply, to)) = reaction.reply {
            transport.send(&reply, to).await;
        }
        if reaction.started {
            ctx.peer_started();
        }
        if let Some(addr) = reaction.established {
            info!("session established with {}", addr);
            return Ok(addr);
        }
    }
}

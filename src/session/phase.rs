use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use log::{debug, info};

/// Where the local session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Idle,
    MatchmakingInProgress,
    MatchmakingFailed,
    MatchFound,
    Countdown,
    Playing,
    GameOver,
}

impl SessionPhase {
    /// Whether `self → to` is a legal transition.
    pub fn can_transition(self, to: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, to),
            (Idle, MatchmakingInProgress)
                | (Idle, MatchFound)
                | (MatchmakingInProgress, MatchFound)
                | (MatchmakingInProgress, MatchmakingFailed)
                | (MatchmakingFailed, MatchmakingInProgress)
                | (MatchFound, Countdown)
                | (Countdown, Playing)
                | (Playing, GameOver)
                | (GameOver, Idle)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseError {
    /// The transition is not part of the session state machine.
    Illegal { from: SessionPhase, to: SessionPhase },
    /// Another activity moved the phase first.
    Stale {
        expected: SessionPhase,
        actual: SessionPhase,
    },
}

impl fmt::Display for PhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseError::Illegal { from, to } => {
                write!(f, "illegal transition {:?} -> {:?}", from, to)
            }
            PhaseError::Stale { expected, actual } => {
                write!(f, "expected phase {:?} but found {:?}", expected, actual)
            }
        }
    }
}

impl std::error::Error for PhaseError {}

/// State shared between the node, the handshake and the dispatcher.
#[derive(Debug)]
pub struct SessionContext {
    phase: Mutex<SessionPhase>,
    endpoint: OnceLock<SocketAddr>,
    dispatcher_started: AtomicBool,
    pending_start: AtomicBool,
    shutdown: AtomicBool,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(SessionPhase::Idle),
            endpoint: OnceLock::new(),
            dispatcher_started: AtomicBool::new(false),
            pending_start: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move from `from` to `to` if the phase is still `from`.
    ///
    /// Leaving matchmaking consumes a latched peer start: entering
    /// `MatchFound` with one pending continues straight to `Countdown`.
    pub fn transition(&self, from: SessionPhase, to: SessionPhase) -> Result<(), PhaseError> {
        if !from.can_transition(to) {
            return Err(PhaseError::Illegal { from, to });
        }
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase != from {
            return Err(PhaseError::Stale {
                expected: from,
                actual: *phase,
            });
        }
        *phase = to;
        info!("session {:?} -> {:?}", from, to);
        if from == SessionPhase::MatchmakingInProgress
            && self.pending_start.swap(false, Ordering::AcqRel)
            && to == SessionPhase::MatchFound
        {
            *phase = SessionPhase::Countdown;
            info!("session {:?} -> {:?} (peer already started)", to, *phase);
        }
        Ok(())
    }

    /// Apply a `start_game` received from the endpoint.
    ///
    /// In `MatchFound` it moves the session to `Countdown`. While matchmaking
    /// is still in progress it is latched for the next transition. Returns
    /// `true` once the countdown has been entered.
    pub fn peer_started(&self) -> bool {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        match *phase {
            SessionPhase::MatchFound => {
                *phase = SessionPhase::Countdown;
                info!("session MatchFound -> Countdown (peer start)");
                true
            }
            SessionPhase::MatchmakingInProgress => {
                self.pending_start.store(true, Ordering::Release);
                debug!("peer started before matchmaking finished");
                false
            }
            other => {
                debug!("start_game ignored in {:?}", other);
                false
            }
        }
    }

    /// Whether a peer start is waiting for `MatchFound`.
    pub fn start_pending(&self) -> bool {
        self.pending_start.load(Ordering::Acquire)
    }

    /// Remote peer address, once a handshake has succeeded.
    pub fn endpoint(&self) -> Option<SocketAddr> {
        self.endpoint.get().copied()
    }

    /// Record the remote peer. The first address wins for the life of the
    /// process; returns the address actually stored.
    pub fn set_endpoint(&self, addr: SocketAddr) -> SocketAddr {
        *self.endpoint.get_or_init(|| addr)
    }

    /// Claim the single dispatcher slot. Returns `false` if already claimed.
    pub fn claim_dispatcher(&self) -> bool {
        self.dispatcher_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn dispatcher_started(&self) -> bool {
        self.dispatcher_started.load(Ordering::Acquire)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

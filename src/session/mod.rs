//! Session layer: phase machine, handshake, dispatcher and the peer node
//!
//! - phase: `SessionPhase` and the shared `SessionContext`
//! - handshake: request / request_ack / ack_ack establishment
//! - dispatcher: background routing of peer traffic into the simulation
//! - node: `PeerNode`, the frame-locked loop driving everything

pub mod dispatcher;
pub mod handshake;
pub mod node;
pub mod phase;

pub use dispatcher::{Dispatcher, DispatcherError, DispatcherHandle, DispatcherStats, InboundQueue};
pub use handshake::{parse_peer, run_handshake, Handshake, HandshakeError, Reaction};
pub use node::{run_local_match, NodeOptions, NodeReport, PeerNode};
pub use phase::{PhaseError, SessionContext, SessionPhase};

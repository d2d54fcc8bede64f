//! Commonly used types and utilities for ease of import.

pub use crate::sim::{Action, EngineConfig, GameEngine, GameStatus, Inbound, Outbound, TickOutcome};

pub use crate::config::NetConfig;
pub use crate::player::{spawn_input, AutoInput, CliInput, Input, InputSource};
pub use crate::protocol::Message;
pub use crate::render::{NullRender, RenderSink, TextRender};
pub use crate::scores::{HighScoreStore, JsonFileStore, MemoryStore};
pub use crate::session::{NodeOptions, NodeReport, PeerNode, SessionContext, SessionPhase};
pub use crate::transport::{InMemoryTransport, Transport, UdpTransport};

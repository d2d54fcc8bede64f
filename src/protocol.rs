#![cfg(feature = "std")]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sim::{Inbound, Outbound};

/// Largest datagram either side will send or accept.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Messages exchanged between the two peers, one per datagram.
///
/// Encoded as a JSON object whose `type` field names the variant, e.g.
/// `{"type":"sync_frame_ack","frame_number":7}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Session request, repeated by the initiator until answered.
    Request,
    RequestAck,
    AckAck,
    /// Either side asks the other to start the countdown.
    StartGame,
    /// A piece locked on the sender's grid.
    GameState {
        frame_number: u64,
        piece_coordinates: Vec<(i32, i32)>,
        next_shape: usize,
    },
    /// Full occupancy snapshot of the sender's grid.
    SyncFrame {
        frame_number: u64,
        grid_bitmap: Vec<u32>,
        score: u64,
    },
    SyncFrameAck { frame_number: u64 },
    Sabotage { index: u8 },
}

impl Message {
    /// Wire name of the message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Request => "request",
            Message::RequestAck => "request_ack",
            Message::AckAck => "ack_ack",
            Message::StartGame => "start_game",
            Message::GameState { .. } => "game_state",
            Message::SyncFrame { .. } => "sync_frame",
            Message::SyncFrameAck { .. } => "sync_frame_ack",
            Message::Sabotage { .. } => "sabotage",
        }
    }

    /// Whether the message belongs to session establishment.
    pub fn is_handshake(&self) -> bool {
        matches!(
            self,
            Message::Request | Message::RequestAck | Message::AckAck
        )
    }
}

#[derive(Debug)]
pub enum ProtocolError {
    Encode(serde_json::Error),
    Decode(serde_json::Error),
    /// Encoded or received payload exceeds [`MAX_DATAGRAM_SIZE`].
    Oversize { len: usize },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Encode(e) => write!(f, "encode failed: {}", e),
            ProtocolError::Decode(e) => write!(f, "malformed message: {}", e),
            ProtocolError::Oversize { len } => write!(
                f,
                "datagram of {} bytes exceeds limit of {}",
                len, MAX_DATAGRAM_SIZE
            ),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Serialize `msg` into a single datagram payload.
pub fn encode(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let bytes = serde_json::to_vec(msg).map_err(ProtocolError::Encode)?;
    if bytes.len() > MAX_DATAGRAM_SIZE {
        return Err(ProtocolError::Oversize { len: bytes.len() });
    }
    Ok(bytes)
}

/// Parse one datagram payload.
pub fn decode(bytes: &[u8]) -> Result<Message, ProtocolError> {
    if bytes.len() > MAX_DATAGRAM_SIZE {
        return Err(ProtocolError::Oversize { len: bytes.len() });
    }
    serde_json::from_slice(bytes).map_err(ProtocolError::Decode)
}

impl From<Outbound> for Message {
    fn from(out: Outbound) -> Self {
        match out {
            Outbound::GameState {
                frame_number,
                piece_coordinates,
                next_shape,
            } => Message::GameState {
                frame_number,
                piece_coordinates,
                next_shape,
            },
            Outbound::SyncFrame {
                frame_number,
                grid_bitmap,
                score,
            } => Message::SyncFrame {
                frame_number,
                grid_bitmap,
                score,
            },
            Outbound::Sabotage { index } => Message::Sabotage { index },
        }
    }
}

/// Gameplay messages become simulation events; anything else is handed back.
impl TryFrom<Message> for Inbound {
    type Error = Message;

    fn try_from(msg: Message) -> Result<Self, Self::Error> {
        match msg {
            Message::GameState {
                frame_number,
                piece_coordinates,
                next_shape,
            } => Ok(Inbound::GameState {
                frame_number,
                piece_coordinates,
                next_shape,
            }),
            Message::SyncFrame {
                frame_number,
                grid_bitmap,
                score,
            } => Ok(Inbound::SyncFrame {
                frame_number,
                grid_bitmap,
                score,
            }),
            Message::Sabotage { index } => Ok(Inbound::Sabotage { index }),
            other => Err(other),
        }
    }
}

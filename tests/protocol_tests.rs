use serde_json::{json, Value};
use tetris_duel::protocol::{decode, encode, Message, ProtocolError, MAX_DATAGRAM_SIZE};
use tetris_duel::{Inbound, Outbound};

fn as_json(msg: &Message) -> Value {
    serde_json::from_slice(&encode(msg).unwrap()).unwrap()
}

#[test]
fn handshake_messages_are_tagged() {
    assert_eq!(as_json(&Message::Request), json!({"type": "request"}));
    assert_eq!(as_json(&Message::RequestAck), json!({"type": "request_ack"}));
    assert_eq!(as_json(&Message::AckAck), json!({"type": "ack_ack"}));
    assert_eq!(as_json(&Message::StartGame), json!({"type": "start_game"}));
}

#[test]
fn gameplay_field_names() {
    let state = Message::GameState {
        frame_number: 3,
        piece_coordinates: vec![(0, 19), (1, 19)],
        next_shape: 4,
    };
    assert_eq!(
        as_json(&state),
        json!({
            "type": "game_state",
            "frame_number": 3,
            "piece_coordinates": [[0, 19], [1, 19]],
            "next_shape": 4
        })
    );

    let sync = Message::SyncFrame {
        frame_number: 7,
        grid_bitmap: vec![0, 1023],
        score: 160,
    };
    assert_eq!(
        as_json(&sync),
        json!({"type": "sync_frame", "frame_number": 7, "grid_bitmap": [0, 1023], "score": 160})
    );
    assert_eq!(
        as_json(&Message::SyncFrameAck { frame_number: 7 }),
        json!({"type": "sync_frame_ack", "frame_number": 7})
    );
    assert_eq!(
        as_json(&Message::Sabotage { index: 2 }),
        json!({"type": "sabotage", "index": 2})
    );
}

#[test]
fn decodes_peer_json() {
    let msg = decode(br#"{"type":"sync_frame_ack","frame_number":12}"#).unwrap();
    assert_eq!(msg, Message::SyncFrameAck { frame_number: 12 });
    assert_eq!(msg.kind(), "sync_frame_ack");

    let msg = decode(br#"{"next_shape":1,"type":"game_state","piece_coordinates":[[4,0]],"frame_number":1}"#).unwrap();
    assert!(matches!(msg, Message::GameState { next_shape: 1, .. }));
}

#[test]
fn rejects_malformed_payloads() {
    assert!(matches!(decode(b"not json"), Err(ProtocolError::Decode(_))));
    assert!(matches!(decode(br#"{"type":"teleport"}"#), Err(ProtocolError::Decode(_))));
    assert!(matches!(decode(br#"{"type":"sabotage","index":"two"}"#), Err(ProtocolError::Decode(_))));
    assert!(matches!(decode(br#"{"type":"sabotage","index":300}"#), Err(ProtocolError::Decode(_))));
    assert!(matches!(decode(br#"{"frame_number":1}"#), Err(ProtocolError::Decode(_))));
}

#[test]
fn oversize_is_rejected_both_ways() {
    let huge = vec![b' '; MAX_DATAGRAM_SIZE + 1];
    assert!(matches!(decode(&huge), Err(ProtocolError::Oversize { .. })));

    let msg = Message::SyncFrame {
        frame_number: 1,
        grid_bitmap: vec![u32::MAX; 1000],
        score: 0,
    };
    assert!(matches!(encode(&msg), Err(ProtocolError::Oversize { .. })));
}

#[test]
fn converts_to_and_from_sim_events() {
    let msg = Message::from(Outbound::Sabotage { index: 0 });
    assert_eq!(msg, Message::Sabotage { index: 0 });
    assert_eq!(Inbound::try_from(msg), Ok(Inbound::Sabotage { index: 0 }));

    let msg = Message::from(Outbound::SyncFrame {
        frame_number: 2,
        grid_bitmap: vec![0; 20],
        score: 40,
    });
    assert!(matches!(Inbound::try_from(msg), Ok(Inbound::SyncFrame { score: 40, .. })));

    assert_eq!(Inbound::try_from(Message::StartGame), Err(Message::StartGame));
    assert!(Message::AckAck.is_handshake());
    assert!(!Message::StartGame.is_handshake());
}

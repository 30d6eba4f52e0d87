use futures::SinkExt;
use rendezvous_core::{ErrorCode, SignalingMessage};
use serde_json::json;

use crate::integration::init_tracing;
use crate::integration::websocket_tests::{connect, http, next_message, send_json, spawn_server};

#[tokio::test]
async fn test_two_clients_negotiate_over_websocket() {
    init_tracing();

    let addr = spawn_server().await;
    let (_, body) = http(addr, "POST", "/rooms").await.unwrap();
    let room_id = serde_json::from_str::<serde_json::Value>(&body).unwrap()["roomId"]
        .as_str()
        .unwrap()
        .to_string();

    let mut alice = connect(addr).await.unwrap();
    let mut bob = connect(addr).await.unwrap();

    send_json(&mut alice, json!({"type": "join-room", "roomId": room_id, "userId": "alice"}))
        .await
        .unwrap();
    assert!(matches!(
        next_message(&mut alice).await.unwrap(),
        SignalingMessage::RoomJoined { .. }
    ));

    send_json(&mut bob, json!({"type": "join-room", "roomId": room_id, "userId": "bob"}))
        .await
        .unwrap();
    let SignalingMessage::RoomJoined { participants, .. } = next_message(&mut bob).await.unwrap() else {
        panic!("bob expected room-joined");
    };
    assert_eq!(participants.len(), 1);
    assert!(matches!(
        next_message(&mut alice).await.unwrap(),
        SignalingMessage::UserJoined { user_id, .. } if user_id.as_str() == "bob"
    ));

    send_json(
        &mut alice,
        json!({"type": "offer", "roomId": room_id, "targetUserId": "bob", "payload": "SDP-A"}),
    )
    .await
    .unwrap();
    let SignalingMessage::Offer(offer) = next_message(&mut bob).await.unwrap() else {
        panic!("bob expected an offer");
    };
    assert_eq!(offer.user_id.as_ref().map(|id| id.as_str()), Some("alice"));
    assert_eq!(offer.payload, json!("SDP-A"));

    bob.close(None).await.unwrap();
    assert!(matches!(
        next_message(&mut alice).await.unwrap(),
        SignalingMessage::UserLeft { user_id, .. } if user_id.as_str() == "bob"
    ));

    let (status, body) = http(addr, "GET", &format!("/rooms/{room_id}")).await.unwrap();
    assert_eq!(status, 200);
    let info: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(info["participantCount"], 1);
}

#[tokio::test]
async fn test_malformed_frame_gets_validation_error() {
    init_tracing();

    let addr = spawn_server().await;
    let mut client = connect(addr).await.unwrap();

    client
        .send(tokio_tungstenite::tungstenite::Message::Text("{not json".into()))
        .await
        .unwrap();

    let SignalingMessage::Error { code, .. } = next_message(&mut client).await.unwrap() else {
        panic!("expected an error reply");
    };
    assert_eq!(code, ErrorCode::Validation);

    // The session survives and still answers.
    send_json(&mut client, json!({"type": "join-room", "roomId": "missing", "userId": "x"}))
        .await
        .unwrap();
    assert_eq!(
        next_message(&mut client).await.unwrap(),
        SignalingMessage::error(ErrorCode::NotFound, "room not found")
    );
}

use rendezvous_core::{ConnectionId, ErrorCode, SignalingMessage};
use rendezvous_server::Dispatch;
use serde_json::json;

use crate::integration::{create_harness, init_tracing};

#[tokio::test]
async fn test_offer_from_outsider_is_not_relayed() {
    init_tracing();

    let harness = create_harness();
    let room_id = harness.coordinator.create_room().await.unwrap();
    let c_a = ConnectionId::new();
    let outsider = ConnectionId::new();
    harness.join(&c_a, &room_id, "alice").await;
    harness.transport.clear().await;

    // Claiming a seated identity does not help.
    let offer = serde_json::from_value(json!({
        "type": "offer",
        "roomId": room_id,
        "userId": "alice",
        "payload": "SDP",
    }))
    .unwrap();
    let dispatch = harness.coordinator.handle_message(&outsider, offer).await;

    assert_eq!(dispatch, Dispatch::Rejected);
    assert_eq!(
        harness.transport.sent_to(&outsider).await,
        vec![SignalingMessage::error(ErrorCode::NotFound, "not in this room")]
    );
    assert!(harness.transport.sent_to(&c_a).await.is_empty());
    assert!(harness.transport.broadcasts().await.is_empty());
}

#[tokio::test]
async fn test_offer_to_absent_target_is_not_found() {
    init_tracing();

    let harness = create_harness();
    let room_id = harness.coordinator.create_room().await.unwrap();
    let c_a = ConnectionId::new();
    harness.join(&c_a, &room_id, "alice").await;
    harness.transport.clear().await;

    let offer = serde_json::from_value(json!({
        "type": "offer",
        "roomId": room_id,
        "targetUserId": "ghost",
        "payload": "SDP",
    }))
    .unwrap();
    let dispatch = harness.coordinator.handle_message(&c_a, offer).await;

    assert_eq!(dispatch, Dispatch::Rejected);
    let replies = harness.transport.sent_to(&c_a).await;
    assert_eq!(replies.len(), 1);
    assert!(matches!(
        &replies[0],
        SignalingMessage::Error {
            code: ErrorCode::NotFound,
            ..
        }
    ));
}

#[tokio::test]
async fn test_offer_without_room_id_is_validation_error() {
    init_tracing();

    let harness = create_harness();
    let conn = ConnectionId::new();

    let offer = serde_json::from_value(json!({"type": "offer", "payload": "SDP"})).unwrap();
    let dispatch = harness.coordinator.handle_message(&conn, offer).await;

    assert_eq!(dispatch, Dispatch::Rejected);
    assert_eq!(
        harness.transport.sent_to(&conn).await,
        vec![SignalingMessage::error(ErrorCode::Validation, "roomId is required")]
    );
}

use rendezvous_core::{ConnectionId, ErrorCode, SignalingMessage};
use rendezvous_server::Dispatch;
use serde_json::json;

use crate::integration::{create_harness, init_tracing};

#[tokio::test]
async fn test_unrecognized_type_is_rejected() {
    init_tracing();

    let harness = create_harness();
    let conn = ConnectionId::new();

    let message = serde_json::from_value(json!({"type": "renegotiate", "roomId": "r1"})).unwrap();
    let dispatch = harness.coordinator.handle_message(&conn, message).await;

    assert_eq!(dispatch, Dispatch::Rejected);
    assert_eq!(
        harness.transport.sent_to(&conn).await,
        vec![SignalingMessage::error(ErrorCode::Validation, "unknown message type")]
    );
}

#[tokio::test]
async fn test_server_only_kinds_are_rejected_from_clients() {
    init_tracing();

    let harness = create_harness();
    let room_id = harness.coordinator.create_room().await.unwrap();
    let conn = ConnectionId::new();

    let forged = SignalingMessage::UserLeft {
        room_id: room_id.clone(),
        user_id: "someone".into(),
    };
    let dispatch = harness.coordinator.handle_message(&conn, forged).await;

    assert_eq!(dispatch, Dispatch::Rejected);
    assert!(harness.transport.broadcasts().await.is_empty());
}

use rendezvous_core::{ConnectionId, ErrorCode, RoomId, SignalingMessage};
use rendezvous_server::{Dispatch, RoomStore};
use serde_json::json;

use crate::integration::{create_harness, init_tracing};

#[tokio::test]
async fn test_join_unknown_room_is_not_found() {
    init_tracing();

    let harness = create_harness();
    let conn = ConnectionId::new();

    let dispatch = harness.join(&conn, &RoomId::from("nowhere"), "alice").await;

    assert_eq!(dispatch, Dispatch::Rejected);
    assert_eq!(
        harness.transport.sent_to(&conn).await,
        vec![SignalingMessage::error(ErrorCode::NotFound, "room not found")]
    );
    assert!(harness.transport.broadcasts().await.is_empty());
    assert!(harness.store.get_room_list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_join_without_room_id_is_validation_error() {
    init_tracing();

    let harness = create_harness();
    let conn = ConnectionId::new();

    let message = serde_json::from_value(json!({"type": "join-room", "userId": "alice"})).unwrap();
    let dispatch = harness.coordinator.handle_message(&conn, message).await;

    assert_eq!(dispatch, Dispatch::Rejected);
    assert_eq!(
        harness.transport.sent_to(&conn).await,
        vec![SignalingMessage::error(ErrorCode::Validation, "roomId is required")]
    );
}

#[tokio::test]
async fn test_join_with_malformed_user_id_is_validation_error() {
    init_tracing();

    let harness = create_harness();
    let room_id = harness.coordinator.create_room().await.unwrap();
    let conn = ConnectionId::new();

    let dispatch = harness.join(&conn, &room_id, "no spaces allowed").await;

    assert_eq!(dispatch, Dispatch::Rejected);
    assert_eq!(harness.participant_count(&room_id).await, Some(0));
}

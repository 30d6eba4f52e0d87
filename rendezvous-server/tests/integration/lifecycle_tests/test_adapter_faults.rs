use std::sync::Arc;

use rendezvous_core::{ConnectionId, ErrorCode, SignalingMessage};
use rendezvous_server::{Dispatch, JoinPolicy};

use crate::integration::{create_harness_with, init_tracing};
use crate::utils::{Fault, FaultyStore, StoreOp};

#[tokio::test]
async fn test_store_failure_becomes_internal_error() {
    init_tracing();

    let store = Arc::new(FaultyStore::new());
    let harness = create_harness_with(store.clone(), JoinPolicy::RequireExisting);
    let room_id = harness.coordinator.create_room().await.unwrap();
    let conn = ConnectionId::new();

    store.inject(StoreOp::Add, Fault::Error);
    let dispatch = harness.join(&conn, &room_id, "alice").await;

    assert_eq!(dispatch, Dispatch::Rejected);
    assert_eq!(
        harness.transport.sent_to(&conn).await,
        vec![SignalingMessage::error(ErrorCode::Internal, "internal error")]
    );
    assert!(harness.transport.broadcasts().await.is_empty());
    assert_eq!(harness.participant_count(&room_id).await, Some(0));
}

#[tokio::test]
async fn test_panicking_store_is_contained() {
    init_tracing();

    let store = Arc::new(FaultyStore::new());
    let harness = create_harness_with(store.clone(), JoinPolicy::RequireExisting);
    let room_id = harness.coordinator.create_room().await.unwrap();
    let conn = ConnectionId::new();

    store.inject(StoreOp::Get, Fault::Panic);
    let dispatch = harness.join(&conn, &room_id, "alice").await;
    assert_eq!(dispatch, Dispatch::Rejected);
    assert_eq!(
        harness.transport.sent_to(&conn).await,
        vec![SignalingMessage::error(ErrorCode::Internal, "internal error")]
    );

    // The room's lock was released by the unwinding.
    store.heal();
    let dispatch = harness.join(&conn, &room_id, "alice").await;
    assert!(matches!(dispatch, Dispatch::Joined { .. }));
}

#[tokio::test]
async fn test_room_list_failure_leaves_disconnect_harmless() {
    init_tracing();

    let store = Arc::new(FaultyStore::new());
    let harness = create_harness_with(store.clone(), JoinPolicy::RequireExisting);
    let room_id = harness.coordinator.create_room().await.unwrap();
    let conn = ConnectionId::new();
    harness.join(&conn, &room_id, "alice").await;

    store.inject(StoreOp::List, Fault::Error);
    assert!(harness.coordinator.handle_disconnect(&conn).await.is_empty());

    store.heal();
    assert_eq!(harness.participant_count(&room_id).await, Some(1));
}

use std::sync::Arc;

use rendezvous_core::{ConnectionId, RoomId};
use rendezvous_server::{Dispatch, JoinPolicy, MemoryRoomStore};

use crate::integration::{create_harness_with, init_tracing};

#[tokio::test]
async fn test_create_on_join_makes_the_room() {
    init_tracing();

    let harness = create_harness_with(Arc::new(MemoryRoomStore::new()), JoinPolicy::CreateOnJoin);
    let room_id = RoomId::from("lobby");
    let conn = ConnectionId::new();

    let dispatch = harness.join(&conn, &room_id, "alice").await;

    assert_eq!(
        dispatch,
        Dispatch::Joined {
            room_id: room_id.clone(),
            user_id: "alice".into()
        }
    );
    assert_eq!(harness.participant_count(&room_id).await, Some(1));
}

#[tokio::test]
async fn test_created_on_join_room_is_deleted_on_last_leave() {
    init_tracing();

    let harness = create_harness_with(Arc::new(MemoryRoomStore::new()), JoinPolicy::CreateOnJoin);
    let room_id = RoomId::from("lobby");
    let conn = ConnectionId::new();

    harness.join(&conn, &room_id, "alice").await;
    harness.leave(&conn, &room_id, "alice").await;

    assert_eq!(harness.participant_count(&room_id).await, None);
}

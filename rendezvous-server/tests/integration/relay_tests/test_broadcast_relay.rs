use rendezvous_core::{ConnectionId, SignalingMessage};
use rendezvous_server::Dispatch;
use serde_json::json;

use crate::integration::{create_harness, init_tracing};

#[tokio::test]
async fn test_untargeted_candidate_goes_to_room_minus_sender() {
    init_tracing();

    let harness = create_harness();
    let room_id = harness.coordinator.create_room().await.unwrap();
    let c_a = ConnectionId::new();
    let c_b = ConnectionId::new();
    harness.join(&c_a, &room_id, "alice").await;
    harness.join(&c_b, &room_id, "bob").await;
    harness.transport.clear().await;

    let candidate = serde_json::from_value(json!({
        "type": "ice-candidate",
        "roomId": room_id,
        "payload": {"candidate": "candidate:1 1 udp 2122260223 10.0.0.2 54321 typ host"},
    }))
    .unwrap();

    let dispatch = harness.coordinator.handle_message(&c_a, candidate).await;

    assert_eq!(dispatch, Dispatch::Relayed);
    let broadcasts = harness.transport.broadcasts().await;
    assert_eq!(broadcasts.len(), 1);

    let (room, message, exclude) = &broadcasts[0];
    assert_eq!(room, &room_id);
    assert_eq!(exclude, &Some(c_a));
    let SignalingMessage::IceCandidate(negotiation) = message else {
        panic!("expected ice-candidate, got {message:?}");
    };
    assert_eq!(negotiation.user_id, Some("alice".into()));
    assert_eq!(negotiation.target_user_id, None);
}

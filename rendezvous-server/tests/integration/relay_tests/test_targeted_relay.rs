use rendezvous_core::{ConnectionId, Negotiation, SignalingMessage};
use rendezvous_server::Dispatch;
use serde_json::json;

use crate::integration::{create_harness, init_tracing};
use crate::utils::Delivery;

#[tokio::test]
async fn test_targeted_offer_is_sent_once_with_authoritative_sender() {
    init_tracing();

    let harness = create_harness();
    let room_id = harness.coordinator.create_room().await.unwrap();
    let c_a = ConnectionId::new();
    let c_b = ConnectionId::new();
    harness.join(&c_a, &room_id, "alice").await;
    harness.join(&c_b, &room_id, "bob").await;
    harness.transport.clear().await;

    let payload = json!({"type": "offer", "sdp": "v=0\r\no=- 42 2 IN IP4 127.0.0.1"});
    let offer = serde_json::from_value(json!({
        "type": "offer",
        "roomId": room_id,
        "userId": "mallory",
        "targetUserId": "bob",
        "payload": payload,
    }))
    .unwrap();

    let dispatch = harness.coordinator.handle_message(&c_a, offer).await;

    assert_eq!(dispatch, Dispatch::Relayed);
    assert_eq!(
        harness.transport.deliveries().await,
        vec![Delivery::Send {
            to: c_b,
            message: SignalingMessage::Offer(Negotiation {
                room_id: Some(room_id.clone()),
                user_id: Some("alice".into()),
                target_user_id: Some("bob".into()),
                payload,
            }),
        }]
    );
}

#[tokio::test]
async fn test_answer_and_candidates_keep_their_kind() {
    init_tracing();

    let harness = create_harness();
    let room_id = harness.coordinator.create_room().await.unwrap();
    let c_a = ConnectionId::new();
    let c_b = ConnectionId::new();
    harness.join(&c_a, &room_id, "alice").await;
    harness.join(&c_b, &room_id, "bob").await;
    harness.transport.clear().await;

    for kind in ["answer", "ice-candidate"] {
        let message = serde_json::from_value(json!({
            "type": kind,
            "roomId": room_id,
            "targetUserId": "alice",
            "payload": "opaque",
        }))
        .unwrap();
        assert_eq!(
            harness.coordinator.handle_message(&c_b, message).await,
            Dispatch::Relayed
        );
    }

    let kinds: Vec<_> = harness
        .transport
        .sent_to(&c_a)
        .await
        .iter()
        .map(|m| m.kind())
        .collect();
    assert_eq!(kinds, vec!["answer", "ice-candidate"]);
}

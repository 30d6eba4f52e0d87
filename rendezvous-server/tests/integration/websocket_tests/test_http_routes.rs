use rendezvous_core::RoomInfo;

use crate::integration::init_tracing;
use crate::integration::websocket_tests::{http, spawn_server};

#[tokio::test]
async fn test_create_then_inspect_room_over_http() {
    init_tracing();

    let addr = spawn_server().await;

    let (status, body) = http(addr, "POST", "/rooms").await.unwrap();
    assert_eq!(status, 201);
    let created: serde_json::Value = serde_json::from_str(&body).unwrap();
    let room_id = created["roomId"].as_str().unwrap().to_string();

    let (status, body) = http(addr, "GET", &format!("/rooms/{room_id}")).await.unwrap();
    assert_eq!(status, 200);
    let info: RoomInfo = serde_json::from_str(&body).unwrap();
    assert_eq!(info.room_id.as_str(), room_id);
    assert_eq!(info.participant_count, 0);
}

#[tokio::test]
async fn test_missing_room_is_404() {
    init_tracing();

    let addr = spawn_server().await;

    let (status, body) = http(addr, "GET", "/rooms/does-not-exist").await.unwrap();
    assert_eq!(status, 404);
    let error: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(error["code"], "not-found");
}

#[tokio::test]
async fn test_health() {
    init_tracing();

    let addr = spawn_server().await;

    let (status, body) = http(addr, "GET", "/health").await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(body, "OK");
}

use crate::engine::Coordinator;
use crate::error::SignalingError;
use crate::signaling;
use crate::transport::ConnectionRegistry;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rendezvous_core::{ErrorCode, RoomId, RoomInfo};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared by every route and WebSocket session.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub registry: Arc<dyn ConnectionRegistry>,
    pub dispatch_timeout: Duration,
}

pub fn build_routes(state: AppState) -> Router {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{room_id}", get(get_room))
        .route("/ws", get(signaling::ws_handler))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRoom {
    pub room_id: RoomId,
}

async fn create_room(State(state): State<AppState>) -> Result<(StatusCode, Json<CreatedRoom>), SignalingError> {
    let room_id = state.coordinator.create_room().await?;
    Ok((StatusCode::CREATED, Json(CreatedRoom { room_id })))
}

async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomInfo>, SignalingError> {
    let room_id = RoomId::parse(&room_id).ok_or(SignalingError::RoomNotFound)?;
    state
        .coordinator
        .get_room_info(&room_id)
        .await?
        .map(Json)
        .ok_or(SignalingError::RoomNotFound)
}

async fn health_check() -> &'static str {
    "OK"
}

#[derive(Serialize)]
struct ErrorBody {
    code: ErrorCode,
    message: String,
}

impl IntoResponse for SignalingError {
    fn into_response(self) -> Response {
        let status = match self.code() {
            ErrorCode::Validation => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Internal => {
                tracing::error!("Request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            code: self.code(),
            message: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use pendulum_shared::protocol::{MessageResponse, StatusResponse};
use pendulum_shared::{LayoutConfig, NewPendulum, Pendulum, PendulumPatch};
use tower_http::cors::CorsLayer;

use crate::error::CoreError;
use crate::state::AppState;
use crate::store::PendulumStore;
use crate::ws::ws_handler;

/// HTTP surface: pendulum CRUD, population start/stop, layout, status and
/// the `/ws` query channel.
pub fn router<S: PendulumStore>(state: AppState<S>) -> Router {
    Router::new()
        .route(
            "/pendulums",
            get(list_pendulums::<S>)
                .post(create_pendulum::<S>)
                .delete(delete_all_pendulums::<S>),
        )
        .route(
            "/pendulums/{id}",
            get(get_pendulum::<S>)
                .put(update_pendulum::<S>)
                .delete(delete_pendulum::<S>),
        )
        .route("/stopAll", post(stop_all::<S>))
        .route("/startAll", post(start_all::<S>))
        .route("/layout", get(layout::<S>))
        .route("/status", get(status::<S>))
        .route("/ws", get(ws_handler::<S>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn list_pendulums<S: PendulumStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Pendulum>>, CoreError> {
    state.registry.list().await.map(Json)
}

async fn get_pendulum<S: PendulumStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Pendulum>, CoreError> {
    state.registry.get(&id).await.map(Json)
}

async fn create_pendulum<S: PendulumStore>(
    State(state): State<AppState<S>>,
    body: Result<Json<NewPendulum>, JsonRejection>,
) -> Result<impl IntoResponse, CoreError> {
    let Json(params) = body?;
    let pendulum = state.registry.create(params).await?;
    Ok((StatusCode::CREATED, Json(pendulum)))
}

async fn update_pendulum<S: PendulumStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    body: Result<Json<PendulumPatch>, JsonRejection>,
) -> Result<Json<Pendulum>, CoreError> {
    let Json(patch) = body?;
    state.registry.update(&id, patch).await.map(Json)
}

async fn delete_pendulum<S: PendulumStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<StatusCode, CoreError> {
    state.registry.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_all_pendulums<S: PendulumStore>(
    State(state): State<AppState<S>>,
) -> Result<StatusCode, CoreError> {
    state.registry.delete_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stop_all<S: PendulumStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<MessageResponse>, CoreError> {
    state.coordinator.stop_all().await?;
    Ok(Json(MessageResponse {
        message: "All pendulums have been stopped.".to_string(),
    }))
}

async fn start_all<S: PendulumStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<MessageResponse>, CoreError> {
    state.coordinator.start_all().await?;
    Ok(Json(MessageResponse {
        message: "All pendulums have been started.".to_string(),
    }))
}

/// The exact layout the collision check projects with.
async fn layout<S: PendulumStore>(State(state): State<AppState<S>>) -> Json<LayoutConfig> {
    Json(*state.coordinator.layout())
}

async fn status<S: PendulumStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<StatusResponse>, CoreError> {
    state.coordinator.status().await.map(Json)
}

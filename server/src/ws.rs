use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use pendulum_shared::protocol::QueryReply;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::coordinator::MotionCoordinator;
use crate::state::AppState;
use crate::store::PendulumStore;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler<S: PendulumStore>(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState<S>>,
) -> Response {
    let permit = match app_state.connection_semaphore.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!("Rejecting query channel: connection limit reached");
            return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
        }
    };

    ws.on_upgrade(move |socket| async move {
        handle_socket(socket, app_state.coordinator).await;
        drop(permit);
    })
}

async fn handle_socket<S: PendulumStore>(socket: WebSocket, coordinator: MotionCoordinator<S>) {
    let (mut sink, mut stream) = socket.split();
    let channel_id = NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed);
    tracing::info!("Query channel {} opened", channel_id);

    // One reply per request; errors are answered in-band and the channel stays open
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let reply = answer_query(&coordinator, text.as_str()).await;
                if sink.send(Message::Text(reply.to_text().into())).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // Ignore ping/pong/binary
            Err(e) => {
                tracing::debug!("Query channel {} read error: {}", channel_id, e);
                break;
            }
        }
    }

    tracing::info!("Query channel {} closed", channel_id);
}

/// Run one angle query and turn the outcome into the reply line.
pub async fn answer_query<S: PendulumStore>(
    coordinator: &MotionCoordinator<S>,
    pendulum_id: &str,
) -> QueryReply {
    match coordinator.on_query(pendulum_id).await {
        Ok(reading) => QueryReply::Angle(reading.angle),
        Err(err) => {
            tracing::debug!("Query for {:?} failed: {}", pendulum_id, err);
            err.to_reply()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::config::ServerConfig;
    use crate::store::MemoryStore;
    use pendulum_shared::Pendulum;
    use std::sync::Arc;

    async fn coordinator() -> MotionCoordinator<MemoryStore> {
        let store = MemoryStore::new();
        store
            .insert(Pendulum {
                id: "p".to_string(),
                theta0: 0.5,
                mass: 1.0,
                length: 2.0,
                triggered_at: 0,
                moving: true,
            })
            .await
            .unwrap();
        MotionCoordinator::new(
            Arc::new(store),
            &ServerConfig::default(),
            Clock::starting_at(0),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn known_id_gets_its_angle() {
        let coordinator = coordinator().await;
        assert_eq!(answer_query(&coordinator, "p").await, QueryReply::Angle(0.5));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_id_gets_not_found_line() {
        let coordinator = coordinator().await;
        let reply = answer_query(&coordinator, "nope").await;
        assert_eq!(reply, QueryReply::NotFound);
        assert_eq!(reply.to_text(), "No pendulum found for that ID");
    }

    #[tokio::test(start_paused = true)]
    async fn blank_id_gets_invalid_line() {
        let coordinator = coordinator().await;
        assert_eq!(answer_query(&coordinator, "").await, QueryReply::InvalidId);
    }
}

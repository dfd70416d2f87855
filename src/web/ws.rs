//! WebSocket status feed for one session.

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AppState;
use super::error::ApiError;
use crate::session::{Session, SessionEvent};

pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws/sessions/{id}", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.store.get(id).await?;
    let shared = state.generator.has_shared_credential();
    info!(session_id = %id, "WebSocket client connecting");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, session, shared)))
}

async fn sync_message(session: &Session, shared_credential: bool) -> Option<Message> {
    let snapshot = session.snapshot(shared_credential).await;
    let event = SessionEvent::StatusSync {
        session: Box::new(snapshot),
    };
    serde_json::to_string(&event)
        .ok()
        .map(|json| Message::Text(json.into()))
}

async fn handle_socket(socket: WebSocket, session: Arc<Session>, shared_credential: bool) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the sync so nothing falls between the two
    let mut rx = session.subscribe();

    if let Some(msg) = sync_message(&session, shared_credential).await {
        if sender.send(msg).await.is_err() {
            warn!(session_id = %session.id, "Failed to send initial sync, client disconnected");
            return;
        }
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                let msg = match result {
                    Ok(event) => serde_json::to_string(&event)
                        .ok()
                        .map(|json| Message::Text(json.into())),
                    Err(RecvError::Lagged(n)) => {
                        warn!(session_id = %session.id, missed = n, "WS client lagged behind broadcast");
                        sync_message(&session, shared_credential).await
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                };
                if let Some(msg) = msg {
                    if sender.send(msg).await.is_err() {
                        debug!("Client disconnected during send");
                        break;
                    }
                }
            }

            result = receiver.next() => {
                match result {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(session_id = %session.id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    // The feed is one-way; client text is ignored
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!(session_id = %session.id, "WebSocket connection closed");
}

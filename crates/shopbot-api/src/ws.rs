//! WebSocket event stream for a loaded session.
//!
//! Each connection gets its own turn reconciler. Inbound text frames are
//! processed one turn at a time; outbound events are forwarded by a separate
//! task so streaming partials reach the client while a turn is still running.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use shopbot_core::{ClientMessage, ServerEvent, SessionKey, SessionProfile};
use tokio::sync::mpsc;

use crate::error::ApiError;
use crate::handlers::KeyParams;
use crate::state::AppState;

pub async fn session(
    State(state): State<AppState>,
    Query(params): Query<KeyParams>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let key = params.require()?;
    let profile = state
        .profile(&key)?
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", key)))?;
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    tracing::info!(session = %key, "Event stream connecting");
    Ok(upgrade.on_upgrade(move |socket| run_session(socket, state, key, profile)))
}

async fn run_session(socket: WebSocket, state: AppState, key: SessionKey, profile: SessionProfile) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let forward_key = key.clone();
    let forward = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(session = %forward_key, "Failed to encode {} event: {}", event.kind(), e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(json.into())).await {
                tracing::debug!(session = %forward_key, "Event stream send failed: {}", e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut turns = state.turn_reconciler(key.clone(), profile, tx.clone());
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(ClientMessage::Text { text }) => {
                    if let Err(e) = turns.handle_input(&text).await {
                        tracing::warn!(session = %key, "Turn failed: {}", e);
                    }
                }
                Err(e) => {
                    tracing::debug!(session = %key, "Unparseable client message: {}", e);
                    if tx.send(ServerEvent::error(format!("Invalid message: {}", e))).is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(session = %key, "Event stream read error: {}", e);
                break;
            }
        }
    }

    drop(turns);
    drop(tx);
    if let Err(e) = forward.await {
        tracing::warn!(session = %key, "Event forwarder ended abnormally: {}", e);
    }
    tracing::info!(session = %key, "Event stream closed");
}

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{debug, warn};
use uuid::Uuid;

use engine::Subscription;

use crate::AppState;

pub fn ws_router() -> Router<AppState> {
    Router::new()
        .route("/ws/bots/:id", get(bot_events))
        .route("/ws/symbols/:symbol", get(symbol_events))
}

/// Candle and decision events of one bot.
async fn bot_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    if !state.registry.contains(id).await {
        return (StatusCode::NOT_FOUND, "unknown bot").into_response();
    }
    // Subscribe before the upgrade so nothing published meanwhile is missed.
    let sub = state.hub.subscribe(&id.to_string());
    ws.on_upgrade(move |socket| forward(socket, sub))
}

/// Events of every bot trading `symbol`.
async fn symbol_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Response {
    let sub = state.hub.subscribe(&symbol);
    ws.on_upgrade(move |socket| forward(socket, sub))
}

/// Writer loop: hub events out as JSON text frames until either side goes
/// away. Dropping `sub` on return removes the client from the hub.
async fn forward(mut socket: WebSocket, mut sub: Subscription) {
    debug!(subject = sub.subject(), client = sub.id(), "websocket client connected");
    loop {
        tokio::select! {
            event = sub.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to encode hub event");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // clients have nothing to say; pings are answered by axum
                Some(Ok(_)) => {}
            },
        }
    }
    debug!(subject = sub.subject(), client = sub.id(), "websocket client disconnected");
}

//! WebSocket upgrade + message loop. Each connection owns one quiz session; each
//! client message is parsed as JSON, applied to that session, and answered with
//! a single JSON message.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, error, instrument, debug};
use uuid::Uuid;

use crate::logic::handle_client_message;
use crate::presentation::build_view;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quizdeck", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state), fields(session_id = %Uuid::new_v4()))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "session", "WebSocket connected");

  // Bookmark store I/O is blocking; keep it off the async workers.
  let mut session = match tokio::task::block_in_place(|| state.new_session()) {
    Ok(s) => s,
    Err(message) => {
      // Terminal: report the load error and keep answering with it until the page leaves.
      let out = to_json(&ServerWsMessage::LoadError { message: message.to_string() });
      if socket.send(Message::Text(out.clone())).await.is_err() {
        return;
      }
      while let Some(Ok(msg)) = socket.recv().await {
        match msg {
          Message::Text(_) => {
            if socket.send(Message::Text(out.clone())).await.is_err() { break; }
          }
          Message::Close(_) => break,
          _ => {}
        }
      }
      info!(target: "session", "WebSocket disconnected (no repository)");
      return;
    }
  };

  let settings = state.view_settings();
  let mut rng = StdRng::from_entropy();

  let first = to_json(&ServerWsMessage::View { view: build_view(&session, settings.jump_block) });
  if let Err(e) = socket.send(Message::Text(first)).await {
    error!(target: "session", error = %e, "WS send error");
    return;
  }

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "session", "WS received: {:?}", &incoming);
            tokio::task::block_in_place(|| handle_client_message(&mut session, incoming, settings, &mut rng))
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        if let Err(e) = socket.send(Message::Text(to_json(&reply_msg))).await {
          error!(target: "session", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "session", score = session.score(), attempts = session.attempts(), "WebSocket disconnected");
}

fn to_json(msg: &ServerWsMessage) -> String {
  serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  })
}

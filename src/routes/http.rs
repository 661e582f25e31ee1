//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Everything here is read-only; quiz actions go through the WebSocket session.

use std::sync::Arc;
use axum::{extract::State, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::logic::{bookmarks, summary};
use crate::protocol::HealthOut;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_summary(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let out = summary(&state);
  info!(target: "quizdeck", loaded = out.loaded, total = out.total_questions, "HTTP summary served");
  Json(out)
}

#[instrument(level = "info", skip(state))]
pub async fn http_bookmarks(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let out = bookmarks(&state);
  info!(target: "quizdeck", count = out.ids.len(), "HTTP bookmarks served");
  Json(out)
}

//! Quizdeck · local exam quiz server
//!
//! - Loads the question document once at startup and validates every record
//! - Serves the static page and the document (./static by default)
//! - One quiz session per WebSocket connection at `/ws`
//! - Bookmarks persisted to a small JSON key-value file
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   QUIZ_CONFIG_PATH     : path to TOML config (see `config::AppConfig`)
//!   QUIZ_STATIC_DIR      : static page directory (default ./static)
//!   QUIZ_DATA_PATH       : question document (default ./static/quiz_data.json)
//!   QUIZ_BOOKMARKS_PATH  : bookmark store file, or "memory"
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod error;
mod domain;
mod config;
mod repository;
mod evaluator;
mod bookmarks;
mod session;
mod presentation;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::AppConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = AppConfig::from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

  // Repository load happens once; a failure is kept and shown to every session.
  let state = Arc::new(AppState::load(config).await);

  let app = build_router(state.clone());

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizdeck", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}

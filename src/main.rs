//! Fact or Fake · Trivia Backend
//!
//! - Axum HTTP API for the mobile app (`/api/v1`) and the admin panel (`/admin`)
//! - SQLite via diesel, migrated and seeded on startup
//! - Optional OpenAI integration for question generation
//! - Static admin panel fallback (./static/index.html)
//!
//! Important env variables (a `.env` file is loaded first when present):
//!   PORT                : u16 (default 3000)
//!   DATABASE_URL        : SQLite file path (default "trivia.db")
//!   DB_POOL_SIZE        : connection pool size (default 8)
//!   ADMIN_USERNAME      : admin login (default "admin")
//!   ADMIN_PASSWORD      : admin password; admin login is refused when unset
//!   JWT_SECRET          : HS256 signing secret (random per process when unset)
//!   JWT_TTL_HOURS       : admin token lifetime (default 12)
//!   OPENAI_API_KEY      : enables question generation if present
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_MODEL        : default "gpt-4o-mini"
//!   TRIVIA_CONFIG_PATH  : path to TOML config (prompts + optional question bank)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod auth;
mod config;
mod db;
mod domain;
mod error;
mod logic;
mod names;
mod openai;
mod protocol;
mod routes;
mod seeds;
mod state;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Settings;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  telemetry::init_tracing();

  let settings = Settings::from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));

  // Database, seeds, prompts and the OpenAI client.
  let state = Arc::new(AppState::bootstrap(settings).await?);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "trivia_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "trivia_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!(target: "trivia_backend", error = %e, "Failed to listen for ctrl-c");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::error!(target: "trivia_backend", error = %e, "Failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
  info!(target: "trivia_backend", "Shutdown signal received");
}

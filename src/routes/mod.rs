//! Router assembly: mobile API, admin API, static admin panel, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::error::ApiError;
use crate::protocol::Envelope;
use crate::state::AppState;

pub mod admin;
pub mod player;

/// What every handler returns: the success envelope or an `ApiError`.
pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// `Json` whose rejections use the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejections use the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose rejections use the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Fallback for unknown paths under the API prefixes.
pub async fn api_not_found() -> ApiError {
    ApiError::not_found("No such endpoint")
}

/// Build the application router with:
/// - Mobile API under `/api/v1/...` (device header auth)
/// - Admin API under `/admin/...` (bearer JWT)
/// - Static admin panel from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .nest("/api/v1", player::router())
        .nest("/admin", admin::router(state.clone()))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Admin panel fallback
        .fallback_service(static_service)
}

//! Router assembly.

use crate::handlers::{ask, health};
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use reglens_core::{AppError, AppResult};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// CORS layer allowing exactly the configured origins.
pub fn cors_layer(origins: &[String]) -> AppResult<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| AppError::Config(format!("Invalid CORS origin '{}': {}", origin, e)))
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Build the application router.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/ask", post(ask))
        .route("/api/health", get(health))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

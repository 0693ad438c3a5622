//! HTTP boundary for Reglens.
//!
//! - `POST /api/ask` answers a question with the pipeline
//! - `GET /api/health` reports liveness

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{AskRequest, AskResponse, HealthResponse};
pub use routes::{cors_layer, router};
pub use state::AppState;

use reglens_core::config::ServerConfig;
use reglens_core::{AppError, AppResult};
use reglens_pipeline::Pipeline;
use std::sync::Arc;

/// Bind `config.bind` and serve until the process is stopped.
pub async fn serve(config: &ServerConfig, pipeline: Arc<Pipeline>) -> AppResult<()> {
    let app = router(AppState::new(pipeline), cors_layer(&config.cors_origins)?);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {}: {}", config.bind, e)))?;

    tracing::info!("Server listening on {}", config.bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Other(format!("Server error: {}", e)))
}

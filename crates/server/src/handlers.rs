//! Request handlers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use reglens_pipeline::{PipelineResult, SourcePreview, VerificationResult};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Response of `POST /api/ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<SourcePreview>,
    pub confidence: f64,
    pub query_type: String,
    pub verification: VerificationResult,
}

impl From<PipelineResult> for AskResponse {
    fn from(result: PipelineResult) -> Self {
        Self {
            answer: result.answer,
            sources: result.sources,
            confidence: result.confidence,
            query_type: result.query_type.to_string(),
            verification: result.verification,
        }
    }
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> ApiResult<Json<AskResponse>> {
    let Json(request) = body?;

    if request.question.trim().is_empty() {
        return Err(ApiError::Validation("question must not be empty".to_string()));
    }

    // The query reaches the pipeline exactly as received
    let result = state.pipeline().run(&request.question).await?;
    tracing::info!("Answered question in run {} after {} passes", result.run_id, result.passes);

    Ok(Json(result.into()))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

//! Shared handler state.

use reglens_pipeline::Pipeline;
use std::sync::Arc;

/// State cloned into every request.
///
/// The pipeline holds no per-request data, so one instance serves all
/// concurrent requests.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

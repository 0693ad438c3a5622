//! Pipeline stages and the transitions between them.
//!
//! Transitions are pure functions of the current stage and the recorded
//! state, so the retry loop can be tested without running any stage.

use crate::state::PipelineState;
use reglens_core::config::PipelineConfig;
use std::fmt;

/// Confidence assumed when no verification result is present.
pub const ABSENT_CONFIDENCE: f64 = 1.0;

/// A step of the answer pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Route,
    Retrieve,
    Synthesize,
    Verify,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Route => "route",
            Stage::Retrieve => "retrieve",
            Stage::Synthesize => "synthesize",
            Stage::Verify => "verify",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// When a weak answer sends the pipeline back to retrieval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retry while confidence is strictly below this
    pub confidence_threshold: f64,
    /// Retry while the retry counter is at or below this
    pub max_retry_count: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            max_retry_count: config.max_retry_count,
        }
    }

    /// Upper bound on retrieval passes in one run.
    pub fn max_passes(&self) -> u32 {
        self.max_retry_count + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Stage that follows verification.
pub fn after_verify(confidence: Option<f64>, retry_count: u32, policy: &RetryPolicy) -> Stage {
    let confidence = confidence.unwrap_or(ABSENT_CONFIDENCE);
    if confidence < policy.confidence_threshold && retry_count <= policy.max_retry_count {
        Stage::Retrieve
    } else {
        Stage::Done
    }
}

/// Stage that follows `stage`, given the state it left behind.
pub fn next_stage(stage: Stage, state: &PipelineState, policy: &RetryPolicy) -> Stage {
    match stage {
        Stage::Route => Stage::Retrieve,
        Stage::Retrieve => Stage::Synthesize,
        Stage::Synthesize => Stage::Verify,
        Stage::Verify => after_verify(
            state.verification().map(|v| v.confidence),
            state.retry_count(),
            policy,
        ),
        Stage::Done => Stage::Done,
    }
}

//! Per-request pipeline state.
//!
//! Each stage reports an outcome and the state records it. A fresh state is
//! built for every query and never shared between requests.

use crate::intent::Intent;
use crate::verifier::VerificationResult;
use reglens_core::{AppError, AppResult};
use reglens_knowledge::Passage;

/// What the router decided.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    pub intent: Intent,
    pub regulations: Vec<String>,
}

/// What one retrieval pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOutcome {
    pub passages: Vec<Passage>,
    /// Counter after this pass
    pub retry_count: u32,
    /// Whether the primary results were replaced by a broader search
    pub widened: bool,
}

/// Accumulated state of one query.
#[derive(Debug, Clone)]
pub struct PipelineState {
    query: String,
    intent: Option<Intent>,
    regulations: Vec<String>,
    passages: Vec<Passage>,
    answer: Option<String>,
    verification: Option<VerificationResult>,
    retry_count: u32,
}

impl PipelineState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            intent: None,
            regulations: Vec::new(),
            passages: Vec::new(),
            answer: None,
            verification: None,
            retry_count: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn intent(&self) -> Option<Intent> {
        self.intent
    }

    pub fn regulations(&self) -> &[String] {
        &self.regulations
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn verification(&self) -> Option<&VerificationResult> {
        self.verification.as_ref()
    }

    /// Number of retrieval passes completed so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Intent and regulations are set once per query.
    pub fn record_route(&mut self, outcome: RouteOutcome) -> AppResult<()> {
        if self.intent.is_some() {
            return Err(AppError::Pipeline("Query has already been routed".to_string()));
        }
        self.intent = Some(outcome.intent);
        self.regulations = outcome.regulations;
        Ok(())
    }

    /// Replace the passages from a new pass.
    ///
    /// The previous answer and verdict no longer describe these passages, so
    /// both are discarded.
    pub fn record_retrieval(&mut self, outcome: RetrievalOutcome) -> AppResult<()> {
        if outcome.retry_count != self.retry_count + 1 {
            return Err(AppError::Pipeline(format!(
                "Retry counter must advance by one (was {}, got {})",
                self.retry_count, outcome.retry_count
            )));
        }
        self.passages = outcome.passages;
        self.retry_count = outcome.retry_count;
        self.answer = None;
        self.verification = None;
        Ok(())
    }

    pub fn record_answer(&mut self, answer: String) {
        self.answer = Some(answer);
    }

    pub fn record_verification(&mut self, verification: VerificationResult) {
        self.verification = Some(verification);
    }
}

//! Packaged output of a finished pipeline run.

use crate::intent::Intent;
use crate::verifier::VerificationResult;
use reglens_knowledge::Passage;
use serde::{Deserialize, Serialize};

/// Passage as shown to callers, with its text cut to a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePreview {
    pub regulation: String,
    pub page: u32,
    pub content: String,
}

impl SourcePreview {
    pub fn from_passage(passage: &Passage, preview_length: usize) -> Self {
        Self {
            regulation: passage.regulation().to_string(),
            page: passage.page(),
            content: truncate_chars(&passage.content, preview_length),
        }
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Result of answering one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: String,
    pub answer: String,
    pub sources: Vec<SourcePreview>,
    pub confidence: f64,
    pub query_type: Intent,
    pub verification: VerificationResult,
    /// Retrieval passes executed
    pub passes: u32,
    /// Untruncated passages behind `sources`
    #[serde(skip)]
    pub passages: Vec<Passage>,
}

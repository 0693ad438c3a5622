//! Compliance verifier.
//!
//! Asks the generation capability to split an answer into claims and judge
//! each one against the retrieved passages, then scores the verdicts
//! locally. The model's own confidence figure is never trusted.

use crate::capability::generate;
use reglens_core::AppResult;
use reglens_knowledge::Passage;
use reglens_llm::LlmClient;
use reglens_prompt::{build_prompt, PromptDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Weight of a PARTIAL claim relative to a SUPPORTED one.
pub const PARTIAL_WEIGHT: f64 = 0.5;

/// Confidence when nothing could be verified.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

const UNPARSEABLE_SUMMARY: &str = "Could not parse verification response";

/// How well a claim is backed by the passages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClaimStatus {
    Supported,
    Partial,
    Unsupported,
}

impl ClaimStatus {
    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "SUPPORTED" => Some(ClaimStatus::Supported),
            "PARTIAL" => Some(ClaimStatus::Partial),
            "UNSUPPORTED" => Some(ClaimStatus::Unsupported),
            _ => None,
        }
    }

    fn weight(&self) -> f64 {
        match self {
            ClaimStatus::Supported => 1.0,
            ClaimStatus::Partial => PARTIAL_WEIGHT,
            ClaimStatus::Unsupported => 0.0,
        }
    }
}

/// Passage a supported claim points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSource {
    pub regulation: String,
    pub page: Option<u32>,
}

/// One atomic assertion taken from an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    pub status: ClaimStatus,
    pub source: Option<ClaimSource>,
}

/// Outcome of verifying an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub claims: Vec<Claim>,
    pub confidence: f64,
    pub summary: String,
}

impl VerificationResult {
    /// Build a result whose confidence is computed from `claims`.
    pub fn from_claims(claims: Vec<Claim>, summary: Option<String>) -> Self {
        let confidence = score_claims(&claims);
        let summary = summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default_summary(&claims));
        Self {
            claims,
            confidence,
            summary,
        }
    }

    /// Neutral result used when the verification payload cannot be decoded.
    pub fn unparseable() -> Self {
        Self {
            claims: Vec::new(),
            confidence: NEUTRAL_CONFIDENCE,
            summary: UNPARSEABLE_SUMMARY.to_string(),
        }
    }

    pub fn count(&self, status: ClaimStatus) -> usize {
        self.claims.iter().filter(|c| c.status == status).count()
    }
}

/// Confidence from claim verdicts.
///
/// SUPPORTED counts 1, PARTIAL counts [`PARTIAL_WEIGHT`], UNSUPPORTED 0,
/// averaged over all claims. An empty list scores [`NEUTRAL_CONFIDENCE`].
pub fn score_claims(claims: &[Claim]) -> f64 {
    if claims.is_empty() {
        return NEUTRAL_CONFIDENCE;
    }
    let total: f64 = claims.iter().map(|c| c.status.weight()).sum();
    total / claims.len() as f64
}

fn default_summary(claims: &[Claim]) -> String {
    let supported = claims
        .iter()
        .filter(|c| c.status == ClaimStatus::Supported)
        .count();
    format!(
        "{} of {} claims are supported by source documents",
        supported,
        claims.len()
    )
}

/// Why a verification payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum VerificationDecodeError {
    #[error("empty verification payload")]
    Empty,

    #[error("invalid verification JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct RawVerification {
    claims: Vec<RawClaim>,
    #[serde(default)]
    confidence: Option<serde_json::Value>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClaim {
    text: String,
    status: String,
    #[serde(default)]
    source: Option<serde_json::Value>,
}

/// Remove one layer of Markdown code fence around a payload, if present.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    if !text.starts_with("```") {
        return text;
    }

    // Drop the opening fence line (which may carry a language tag)
    let body = match text.find('\n') {
        Some(idx) => &text[idx + 1..],
        None => return "",
    };

    let body = body.trim_end();
    match body.rfind('\n') {
        Some(idx) if body[idx + 1..].trim_start().starts_with("```") => &body[..idx],
        None if body.trim_start().starts_with("```") => "",
        _ => body,
    }
}

/// Strictly decode a verification payload.
pub fn decode_verification(text: &str) -> Result<VerificationResult, VerificationDecodeError> {
    let body = strip_code_fence(text);
    if body.trim().is_empty() {
        return Err(VerificationDecodeError::Empty);
    }

    let raw: RawVerification = serde_json::from_str(body)?;

    let claims = raw
        .claims
        .into_iter()
        .map(|raw| {
            let status = ClaimStatus::from_label(&raw.status).unwrap_or_else(|| {
                tracing::warn!(
                    "Unknown claim status '{}', treating as UNSUPPORTED",
                    raw.status
                );
                ClaimStatus::Unsupported
            });
            let source = match status {
                ClaimStatus::Supported => raw.source.as_ref().and_then(claim_source_from_value),
                _ => None,
            };
            Claim {
                text: raw.text,
                status,
                source,
            }
        })
        .collect();

    let result = VerificationResult::from_claims(claims, raw.summary);

    if let Some(reported) = raw.confidence.as_ref().and_then(|v| v.as_f64()) {
        tracing::debug!(
            "Ignoring model-reported confidence {} (computed {})",
            reported,
            result.confidence
        );
    }

    Ok(result)
}

/// Decode a payload, falling back to [`VerificationResult::unparseable`].
pub fn parse_verification(text: &str) -> VerificationResult {
    decode_verification(text).unwrap_or_else(|e| {
        tracing::warn!("Verification response could not be decoded: {}", e);
        VerificationResult::unparseable()
    })
}

/// Source pointer given either as text or as `{"regulation", "page"}`.
fn claim_source_from_value(value: &serde_json::Value) -> Option<ClaimSource> {
    match value {
        serde_json::Value::String(text) => parse_claim_source(text),
        serde_json::Value::Object(fields) => {
            let regulation = fields
                .get("regulation")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|r| !r.is_empty())?;
            let page = fields.get("page").and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
                _ => None,
            });
            Some(ClaimSource {
                regulation: regulation.to_string(),
                page,
            })
        }
        _ => None,
    }
}

/// Split a pointer such as `"SR 11-7, Page 12"` or `"SR 11-7 | Page 12"`.
fn parse_claim_source(raw: &str) -> Option<ClaimSource> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return None;
    }

    let lower = raw.to_ascii_lowercase();
    if let Some(idx) = lower.rfind("page") {
        let regulation = raw[..idx].trim().trim_end_matches([',', '|']).trim();
        let page = raw[idx + 4..].trim().parse::<u32>().ok();
        if !regulation.is_empty() {
            return Some(ClaimSource {
                regulation: regulation.to_string(),
                page,
            });
        }
    }

    Some(ClaimSource {
        regulation: raw.to_string(),
        page: None,
    })
}

/// Verification context: one labelled block per passage.
pub fn format_sources(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| format!("[{} | Page {}]\n{}", p.regulation(), p.page(), p.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Scores an answer's claims against its passages.
pub struct ComplianceVerifier {
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    timeout: Duration,
}

impl ComplianceVerifier {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            llm,
            prompt,
            model: model.into(),
            timeout,
        }
    }

    /// Verify `answer` against `passages`.
    ///
    /// An undecodable response is not an error; only a failed capability
    /// call is.
    pub async fn verify(&self, answer: &str, passages: &[Passage]) -> AppResult<VerificationResult> {
        let mut variables = HashMap::new();
        variables.insert("answer".to_string(), answer.to_string());
        variables.insert("sources".to_string(), format_sources(passages));
        let prompt = build_prompt(&self.prompt, variables)?;

        let response = generate(self.llm.as_ref(), prompt, &self.model, self.timeout).await?;
        let result = parse_verification(&response);

        tracing::info!(
            "Verified answer: {} claims, {} supported, {} partial, confidence {:.2}",
            result.claims.len(),
            result.count(ClaimStatus::Supported),
            result.count(ClaimStatus::Partial),
            result.confidence
        );

        Ok(result)
    }
}

//! Retrieval-augmented answer pipeline for Reglens.
//!
//! A query is routed once, then passages are retrieved, an answer is
//! synthesized and its claims are verified. Weak answers loop back to
//! retrieval a bounded number of times.
//!
//! - [`QueryRouter`]: intent classification and regulation detection
//! - [`RetrievalSelector`]: search strategy per intent, widening on retry
//! - [`AnswerSynthesizer`]: cited answer from passages
//! - [`ComplianceVerifier`]: claim-level support and confidence
//! - [`Pipeline`]: the controller tying the stages together

mod capability;
pub mod controller;
pub mod intent;
pub mod machine;
pub mod result;
pub mod retrieval;
pub mod router;
pub mod state;
pub mod synthesizer;
pub mod verifier;

pub use controller::{Pipeline, PipelinePrompts, PipelineSettings};
pub use intent::Intent;
pub use machine::{after_verify, next_stage, RetryPolicy, Stage};
pub use result::{PipelineResult, SourcePreview};
pub use retrieval::{plan_searches, PlannedSearch, RetrievalSelector};
pub use router::QueryRouter;
pub use state::{PipelineState, RetrievalOutcome, RouteOutcome};
pub use synthesizer::AnswerSynthesizer;
pub use verifier::{
    parse_verification, Claim, ClaimSource, ClaimStatus, ComplianceVerifier, VerificationResult,
};

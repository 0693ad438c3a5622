//! Pipeline controller.
//!
//! Drives one query through route, retrieve, synthesize and verify, looping
//! back to retrieval while the verifier is not confident enough. The
//! controller owns only immutable components; all run state lives in a
//! [`PipelineState`] created per call, so one [`Pipeline`] serves
//! concurrent queries.

use crate::intent::Intent;
use crate::machine::{next_stage, RetryPolicy, Stage};
use crate::result::{PipelineResult, SourcePreview};
use crate::retrieval::RetrievalSelector;
use crate::router::QueryRouter;
use crate::state::PipelineState;
use crate::synthesizer::AnswerSynthesizer;
use crate::verifier::ComplianceVerifier;
use reglens_core::config::{ModelRole, PipelineConfig};
use reglens_core::{AppConfig, AppError, AppResult};
use reglens_knowledge::{RegulationCatalog, SimilaritySearch};
use reglens_llm::LlmClient;
use reglens_prompt::{
    builtin_prompt, load_prompt, PromptDefinition, CLASSIFY_PROMPT_ID, SYNTHESIZE_PROMPT_ID,
    VERIFY_PROMPT_ID,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Prompt definitions used by the stages.
#[derive(Debug, Clone)]
pub struct PipelinePrompts {
    pub classify: PromptDefinition,
    pub synthesize: PromptDefinition,
    pub verify: PromptDefinition,
}

impl PipelinePrompts {
    /// The prompts shipped with the crate.
    pub fn builtin() -> AppResult<Self> {
        Ok(Self {
            classify: builtin_prompt(CLASSIFY_PROMPT_ID)?,
            synthesize: builtin_prompt(SYNTHESIZE_PROMPT_ID)?,
            verify: builtin_prompt(VERIFY_PROMPT_ID)?,
        })
    }

    /// Built-in prompts, replaced by any workspace overrides.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            classify: load_prompt(workspace, CLASSIFY_PROMPT_ID)?,
            synthesize: load_prompt(workspace, SYNTHESIZE_PROMPT_ID)?,
            verify: load_prompt(workspace, VERIFY_PROMPT_ID)?,
        })
    }
}

/// Models, limits and retry policy of a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub classifier_model: String,
    pub synthesizer_model: String,
    pub verifier_model: String,
    pub policy: RetryPolicy,
    pub preview_length: usize,
    pub capability_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            classifier_model: config.model_for(ModelRole::Classifier).to_string(),
            synthesizer_model: config.model_for(ModelRole::Synthesizer).to_string(),
            verifier_model: config.model_for(ModelRole::Verifier).to_string(),
            policy: RetryPolicy::from_config(&config.pipeline),
            preview_length: config.pipeline.preview_length,
            capability_timeout: Duration::from_secs(config.pipeline.capability_timeout_secs),
        }
    }

    /// Use one model for every stage.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.classifier_model = model.clone();
        self.synthesizer_model = model.clone();
        self.verifier_model = model;
        self
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            classifier_model: String::new(),
            synthesizer_model: String::new(),
            verifier_model: String::new(),
            policy: RetryPolicy::from_config(&pipeline),
            preview_length: pipeline.preview_length,
            capability_timeout: Duration::from_secs(pipeline.capability_timeout_secs),
        }
    }
}

/// The retrieval-augmented answer pipeline.
pub struct Pipeline {
    router: QueryRouter,
    retrieval: RetrievalSelector,
    synthesizer: AnswerSynthesizer,
    verifier: ComplianceVerifier,
    policy: RetryPolicy,
    preview_length: usize,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SimilaritySearch>,
        catalog: Arc<RegulationCatalog>,
        prompts: PipelinePrompts,
        settings: PipelineSettings,
    ) -> Self {
        let timeout = settings.capability_timeout;
        Self {
            router: QueryRouter::new(
                llm.clone(),
                catalog,
                prompts.classify,
                settings.classifier_model,
                timeout,
            ),
            retrieval: RetrievalSelector::new(search, timeout),
            synthesizer: AnswerSynthesizer::new(
                llm.clone(),
                prompts.synthesize,
                settings.synthesizer_model,
                timeout,
            ),
            verifier: ComplianceVerifier::new(llm, prompts.verify, settings.verifier_model, timeout),
            policy: settings.policy,
            preview_length: settings.preview_length,
        }
    }

    /// Build a pipeline from configuration, loading workspace prompt overrides.
    pub fn from_config(
        config: &AppConfig,
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SimilaritySearch>,
        catalog: Arc<RegulationCatalog>,
    ) -> AppResult<Self> {
        let prompts = PipelinePrompts::load(&config.workspace)?;
        Ok(Self::new(
            llm,
            search,
            catalog,
            prompts,
            PipelineSettings::from_config(config),
        ))
    }

    /// Answer one question.
    ///
    /// Fails only when a capability call fails or times out.
    pub async fn run(&self, query: &str) -> AppResult<PipelineResult> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("pipeline", run_id = %run_id);
        self.drive(query, run_id.clone()).instrument(span).await
    }

    async fn drive(&self, query: &str, run_id: String) -> AppResult<PipelineResult> {
        let mut state = PipelineState::new(query);
        let mut stage = Stage::Route;

        tracing::info!("Pipeline started ({} chars)", query.len());

        while stage != Stage::Done {
            tracing::debug!("Entering {} stage (retry count {})", stage, state.retry_count());
            self.step(stage, &mut state).await?;
            stage = next_stage(stage, &state, &self.policy);
        }

        self.package(state, run_id)
    }

    async fn step(&self, stage: Stage, state: &mut PipelineState) -> AppResult<()> {
        match stage {
            Stage::Route => {
                let outcome = self.router.route(state.query()).await?;
                state.record_route(outcome)
            }
            Stage::Retrieve => {
                let intent = routed_intent(state)?;
                let outcome = self
                    .retrieval
                    .select_and_retrieve(
                        state.query(),
                        intent,
                        state.regulations(),
                        state.retry_count(),
                    )
                    .await?;
                state.record_retrieval(outcome)
            }
            Stage::Synthesize => {
                let intent = routed_intent(state)?;
                let answer = self
                    .synthesizer
                    .synthesize(state.query(), intent, state.passages())
                    .await?;
                state.record_answer(answer);
                Ok(())
            }
            Stage::Verify => {
                let answer = state.answer().unwrap_or_default();
                let verification = self.verifier.verify(answer, state.passages()).await?;
                if verification.confidence < self.policy.confidence_threshold {
                    tracing::info!(
                        "Low confidence answer: {:.2} after {} retrieval passes",
                        verification.confidence,
                        state.retry_count()
                    );
                }
                state.record_verification(verification);
                Ok(())
            }
            Stage::Done => Ok(()),
        }
    }

    fn package(&self, state: PipelineState, run_id: String) -> AppResult<PipelineResult> {
        let query_type = routed_intent(&state)?;
        let verification = state
            .verification()
            .cloned()
            .ok_or_else(|| AppError::Pipeline("Run finished without verification".to_string()))?;
        let passages = state.passages().to_vec();
        let sources = passages
            .iter()
            .map(|p| SourcePreview::from_passage(p, self.preview_length))
            .collect();

        let result = PipelineResult {
            run_id,
            answer: state.answer().unwrap_or_default().to_string(),
            sources,
            confidence: verification.confidence,
            query_type,
            verification,
            passes: state.retry_count(),
            passages,
        };

        tracing::info!(
            "Pipeline finished: {} query, {} passes, {} sources, confidence {:.2}",
            result.query_type,
            result.passes,
            result.sources.len(),
            result.confidence
        );

        Ok(result)
    }
}

fn routed_intent(state: &PipelineState) -> AppResult<Intent> {
    state
        .intent()
        .ok_or_else(|| AppError::Pipeline("Query has not been routed".to_string()))
}

//! Query routing: intent classification and regulation detection.

use crate::capability::generate;
use crate::intent::Intent;
use crate::state::RouteOutcome;
use reglens_core::AppResult;
use reglens_knowledge::RegulationCatalog;
use reglens_llm::LlmClient;
use reglens_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Decides what a query is asking for and which regulations it names.
pub struct QueryRouter {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<RegulationCatalog>,
    prompt: PromptDefinition,
    model: String,
    timeout: Duration,
}

impl QueryRouter {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        catalog: Arc<RegulationCatalog>,
        prompt: PromptDefinition,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            llm,
            catalog,
            prompt,
            model: model.into(),
            timeout,
        }
    }

    /// Classify the query and detect the regulations it mentions.
    pub async fn route(&self, query: &str) -> AppResult<RouteOutcome> {
        let regulations = self.catalog.detect_regulations(query);
        let intent = self.classify(query).await?;

        tracing::info!("Routed query as {} (regulations: {:?})", intent, regulations);

        Ok(RouteOutcome {
            intent,
            regulations,
        })
    }

    /// Ask the generation capability for an intent label.
    ///
    /// A label outside the closed set resolves to [`Intent::Explain`]. Only a
    /// failed capability call is an error.
    pub async fn classify(&self, query: &str) -> AppResult<Intent> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        let prompt = build_prompt(&self.prompt, variables)?;

        let label = generate(self.llm.as_ref(), prompt, &self.model, self.timeout).await?;

        Ok(Intent::from_label(&label).unwrap_or_else(|| {
            tracing::warn!(
                "Unrecognised intent label '{}', falling back to {}",
                label.trim(),
                Intent::Explain
            );
            Intent::Explain
        }))
    }
}

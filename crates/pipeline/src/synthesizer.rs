//! Grounded answer synthesis.

use crate::capability::generate;
use crate::intent::Intent;
use reglens_core::AppResult;
use reglens_knowledge::Passage;
use reglens_llm::LlmClient;
use reglens_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

const NO_SOURCES: &str = "(no source documents were retrieved)";

/// Render passages as labelled blocks, in the order given.
pub fn format_context(passages: &[Passage]) -> String {
    if passages.is_empty() {
        return NO_SOURCES.to_string();
    }
    passages
        .iter()
        .map(|p| {
            format!(
                "[Source: {} | Page {}]\n{}",
                p.regulation(),
                p.page(),
                p.content
            )
        })
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Writes a cited answer from retrieved passages.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    timeout: Duration,
}

impl AnswerSynthesizer {
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

    /// Generate an answer for `query` in the style of `intent`.
    ///
    /// Citations in the returned text are not checked here.
    pub async fn synthesize(
        &self,
        query: &str,
        intent: Intent,
        passages: &[Passage],
    ) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        variables.insert("intent".to_string(), intent.as_str().to_string());
        variables.insert("style".to_string(), intent.style_directive().to_string());
        variables.insert("context".to_string(), format_context(passages));
        let prompt = build_prompt(&self.prompt, variables)?;

        let answer = generate(self.llm.as_ref(), prompt, &self.model, self.timeout).await?;

        tracing::info!(
            "Synthesized answer of {} chars from {} passages",
            answer.len(),
            passages.len()
        );

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reglens_llm::MockClient;
    use reglens_prompt::{builtin_prompt, SYNTHESIZE_PROMPT_ID};

    fn passages() -> Vec<Passage> {
        vec![
            Passage::new("Models must be documented.", "SR 11-7", "sr1107.txt", 9),
            Passage::new("Map, measure, manage.", "NIST AI RMF", "nist.txt", 4),
        ]
    }

    #[test]
    fn test_format_context_preserves_order() {
        let context = format_context(&passages());
        assert_eq!(
            context,
            "[Source: SR 11-7 | Page 9]\nModels must be documented.\n\n---\n\n\
             [Source: NIST AI RMF | Page 4]\nMap, measure, manage."
        );
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), NO_SOURCES);
    }

    #[tokio::test]
    async fn test_synthesize_sends_style_and_context() {
        let llm = Arc::new(MockClient::with_responses([
            "Document models. [Source: SR 11-7, Page 9]",
        ]));
        let synthesizer = AnswerSynthesizer::new(
            llm.clone(),
            builtin_prompt(SYNTHESIZE_PROMPT_ID).unwrap(),
            "writer",
            Duration::from_secs(5),
        );

        let answer = synthesizer
            .synthesize("How should models be documented?", Intent::Checklist, &passages())
            .await
            .unwrap();
        assert_eq!(answer, "Document models. [Source: SR 11-7, Page 9]");

        let request = &llm.requests()[0];
        assert_eq!(request.model, "writer");
        let system = request.system.as_deref().unwrap();
        assert!(system.contains("[Source: <regulation>, Page <n>]"));
        assert!(system.contains(Intent::Checklist.style_directive()));
        assert!(request.prompt.contains("Question type: CHECKLIST"));
        assert!(request.prompt.contains("[Source: SR 11-7 | Page 9]"));
        assert!(request.prompt.contains("How should models be documented?"));
        assert!(!request.json_output);
    }
}

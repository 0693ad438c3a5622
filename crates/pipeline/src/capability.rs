//! Calls to external capabilities, bounded by a timeout.

use reglens_core::{AppError, AppResult};
use reglens_llm::{LlmClient, LlmRequest};
use reglens_prompt::BuiltPrompt;
use std::future::Future;
use std::time::Duration;

/// Await `call`, failing with [`AppError::Timeout`] after `limit`.
pub(crate) async fn with_timeout<T, F>(capability: &str, limit: Duration, call: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "{} did not answer within {:?}",
            capability, limit
        ))),
    }
}

/// Send a built prompt to the generation capability at temperature 0.
pub(crate) async fn generate(
    llm: &dyn LlmClient,
    prompt: BuiltPrompt,
    model: &str,
    limit: Duration,
) -> AppResult<String> {
    let mut request = LlmRequest::new(prompt.user, model).with_temperature(0.0);
    if let Some(system) = prompt.system {
        request = request.with_system(system);
    }
    if prompt.metadata.json_output {
        request = request.with_json_output();
    }

    tracing::debug!(
        "Calling {} with prompt {} on model {} ({} chars)",
        llm.provider_name(),
        prompt.metadata.source_prompt_id,
        model,
        request.prompt.len() + request.system.as_ref().map_or(0, |s| s.len())
    );

    let response = with_timeout("Text generation", limit, llm.complete(&request)).await?;
    Ok(response.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reglens_llm::MockClient;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: AppResult<()> = with_timeout("Slow thing", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert!(err.is_capability_failure());
    }

    #[tokio::test]
    async fn test_with_timeout_passes_errors_through() {
        let result: AppResult<()> = with_timeout("Search", Duration::from_secs(1), async {
            Err(AppError::Retrieval("down".to_string()))
        })
        .await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_generate_builds_request() {
        let mock = MockClient::with_responses(["ok"]);
        let prompt = BuiltPrompt::new(
            Some("system text".to_string()),
            "user text".to_string(),
            "answer.verify".to_string(),
            true,
            HashMap::new(),
        );

        let content = generate(&mock, prompt, "gpt-4o-mini", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(content, "ok");

        let request = &mock.requests()[0];
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.system.as_deref(), Some("system text"));
        assert_eq!(request.temperature, Some(0.0));
        assert!(request.json_output);
    }
}

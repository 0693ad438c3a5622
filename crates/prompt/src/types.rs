//! Prompt types for Reglens.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Optional system message template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// User message template with Handlebars syntax
    pub template: String,

    /// Output format
    pub output: PromptOutputSpec,
}

/// Output format of the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Expected completion format
    pub format: OutputFormat,
}

/// Format the completion is expected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Markdown,
    Json,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Whether the provider should be asked for a JSON object
    #[serde(rename = "jsonOutput")]
    pub json_output: bool,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        system: Option<String>,
        user: String,
        source_prompt_id: String,
        json_output: bool,
        resolved_variables: HashMap<String, String>,
    ) -> Self {
        Self {
            system,
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                json_output,
                resolved_variables,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: test.prompt
title: Test Prompt
apiVersion: "1.0"
createdBy: test
system: "You answer questions."
template: "{{query}}"
output:
  format: json
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "test.prompt");
        assert_eq!(def.system.as_deref(), Some("You answer questions."));
        assert_eq!(def.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_system_is_optional() {
        let yaml = r#"
id: test.prompt
title: Test Prompt
apiVersion: "1.0"
template: "{{query}}"
output:
  format: text
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(def.system.is_none());
        assert!(def.created_by.is_empty());
    }

    #[test]
    fn test_unknown_output_format_rejected() {
        let yaml = r#"
id: test.prompt
title: Test Prompt
apiVersion: "1.0"
template: "{{query}}"
output:
  format: xml
"#;

        assert!(serde_yaml::from_str::<PromptDefinition>(yaml).is_err());
    }

    #[test]
    fn test_built_prompt_creation() {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "test".to_string());

        let built = BuiltPrompt::new(
            Some("System message".to_string()),
            "User message".to_string(),
            "test.prompt".to_string(),
            true,
            vars,
        );

        assert_eq!(built.system, Some("System message".to_string()));
        assert_eq!(built.user, "User message");
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
        assert!(built.metadata.json_output);
    }
}

//! Prompt loader for YAML prompt definitions.
//!
//! Every prompt the pipeline uses ships built into the binary. A workspace
//! can replace any of them by dropping `<id>.yml` into `.reglens/prompts/`.

use crate::types::PromptDefinition;
use reglens_core::{AppError, AppResult};
use std::path::Path;

/// IDs of the prompts shipped with the crate.
pub const BUILTIN_PROMPT_IDS: [&str; 3] = ["route.classify", "answer.synthesize", "answer.verify"];

const PROMPTS_DIR: &str = ".reglens/prompts";

/// Raw YAML of a built-in prompt.
fn builtin_source(prompt_id: &str) -> Option<&'static str> {
    match prompt_id {
        "route.classify" => Some(include_str!("../prompts/route.classify.yml")),
        "answer.synthesize" => Some(include_str!("../prompts/answer.synthesize.yml")),
        "answer.verify" => Some(include_str!("../prompts/answer.verify.yml")),
        _ => None,
    }
}

/// Load a built-in prompt definition, ignoring workspace overrides.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<PromptDefinition> {
    let source = builtin_source(prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown built-in prompt: {}", prompt_id)))?;
    parse_prompt(source, &format!("built-in {}", prompt_id))
}

/// Load a prompt definition by ID.
///
/// A file named `<id>.yml` in `.reglens/prompts/` takes precedence over the
/// built-in definition of the same ID.
///
/// # Arguments
/// * `workspace_path` - Root workspace directory containing `.reglens/`
/// * `prompt_id` - Prompt identifier (e.g., "answer.verify")
///
/// # Example
/// ```no_run
/// use reglens_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "answer.verify")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(PROMPTS_DIR)
        .join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        tracing::debug!("Using built-in prompt: {}", prompt_id);
        return builtin_prompt(prompt_id);
    }

    tracing::debug!("Loading prompt override from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition = parse_prompt(&contents, &format!("{:?}", prompt_file))?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file, definition.id, prompt_id
        )));
    }

    tracing::info!(
        "Loaded prompt override: {} ({})",
        definition.id,
        definition.title
    );

    Ok(definition)
}

/// List all available prompt IDs: built-ins plus workspace overrides.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids: Vec<String> = BUILTIN_PROMPT_IDS.iter().map(|s| s.to_string()).collect();

    let prompts_dir = workspace_path.join(PROMPTS_DIR);
    if prompts_dir.exists() {
        for entry in walkdir::WalkDir::new(&prompts_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    prompt_ids.sort();
    prompt_ids.dedup();
    Ok(prompt_ids)
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    // Validate API version format (simple check)
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputFormat;
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, id: &str, content: &str) {
        let prompts_dir = dir.join(PROMPTS_DIR);
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join(format!("{}.yml", id)), content).unwrap();
    }

    #[test]
    fn test_builtin_prompts_are_valid() {
        for id in BUILTIN_PROMPT_IDS {
            let def = builtin_prompt(id).unwrap();
            assert_eq!(def.id, id);
        }
    }

    #[test]
    fn test_verify_prompt_expects_json() {
        let def = builtin_prompt("answer.verify").unwrap();
        assert_eq!(def.output.format, OutputFormat::Json);
        assert!(def.template.contains("{{answer}}"));
        assert!(def.template.contains("{{sources}}"));
    }

    #[test]
    fn test_synthesize_prompt_has_system_rules() {
        let def = builtin_prompt("answer.synthesize").unwrap();
        let system = def.system.unwrap();
        assert!(system.contains("[Source: <regulation>, Page <n>]"));
        assert!(system.contains("{{style}}"));
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin_prompt("agent.ask.default").is_err());
    }

    #[test]
    fn test_load_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(temp_dir.path(), "route.classify").unwrap();
        assert_eq!(prompt.id, "route.classify");
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            "route.classify",
            r#"
id: route.classify
title: "Custom classifier"
apiVersion: "1.1"
template: "Label: {{query}}"
output:
  format: text
"#,
        );

        let prompt = load_prompt(temp_dir.path(), "route.classify").unwrap();
        assert_eq!(prompt.title, "Custom classifier");
        assert_eq!(prompt.template, "Label: {{query}}");
    }

    #[test]
    fn test_override_with_mismatched_id() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            "answer.verify",
            r#"
id: something.else
title: "Wrong"
apiVersion: "1.0"
template: "x"
output:
  format: json
"#,
        );

        assert!(load_prompt(temp_dir.path(), "answer.verify").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), "answer.verify", "invalid: yaml: content:");

        assert!(load_prompt(temp_dir.path(), "answer.verify").is_err());
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), "route.classify", "id: route.classify");
        write_override(temp_dir.path(), "custom.extra", "id: custom.extra");

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts.len(), 4);
        assert!(prompts.contains(&"custom.extra".to_string()));
        assert!(prompts.contains(&"answer.verify".to_string()));
    }
}

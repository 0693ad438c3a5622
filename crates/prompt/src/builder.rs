//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, OutputFormat, PromptDefinition};
use handlebars::Handlebars;
use reglens_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Renders the optional system template and the user template with the same
/// variables. Passage text is inserted verbatim (no HTML escaping).
///
/// # Example
/// ```no_run
/// use reglens_prompt::{build_prompt, builtin_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt("route.classify")?;
/// let mut vars = HashMap::new();
/// vars.insert("query".to_string(), "What is effective challenge?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?;

    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        definition.output.format == OutputFormat::Json,
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

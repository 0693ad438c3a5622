//! Prompt system for Reglens.
//!
//! This crate provides structured prompt management with:
//! - Built-in YAML prompt definitions for every pipeline stage
//! - Workspace overrides in `.reglens/prompts/<id>.yml`
//! - Handlebars rendering of the system and user messages

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, list_prompts, load_prompt, BUILTIN_PROMPT_IDS};
pub use types::{BuiltPrompt, BuiltPromptMetadata, OutputFormat, PromptDefinition, PromptOutputSpec};

/// Prompt used by the query router to classify intent.
pub const CLASSIFY_PROMPT_ID: &str = "route.classify";

/// Prompt used by the answer synthesizer.
pub const SYNTHESIZE_PROMPT_ID: &str = "answer.synthesize";

/// Prompt used by the compliance verifier.
pub const VERIFY_PROMPT_ID: &str = "answer.verify";

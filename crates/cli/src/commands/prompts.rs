//! Prompts command handler.

use clap::Args;
use reglens_core::{config::AppConfig, AppResult};
use reglens_prompt::{list_prompts, load_prompt};

/// List the prompt definitions in effect
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let overrides = config.reglens_dir().join("prompts");
        let ids = list_prompts(&config.workspace)?;

        if self.json {
            let prompts = ids
                .iter()
                .map(|id| load_prompt(&config.workspace, id))
                .collect::<AppResult<Vec<_>>>()?;
            println!("{}", serde_json::to_string_pretty(&prompts)?);
        } else {
            for id in &ids {
                let prompt = load_prompt(&config.workspace, id)?;
                let origin = if overrides.join(format!("{}.yml", id)).exists() {
                    "workspace"
                } else {
                    "built-in"
                };
                println!("{} ({}) - {}", prompt.id, origin, prompt.title);
            }
        }

        Ok(())
    }
}

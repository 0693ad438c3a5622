//! Catalog command handler.

use super::load_catalog;
use clap::Args;
use reglens_core::{config::AppConfig, AppResult};

/// Show the regulation catalog in effect
#[derive(Args, Debug)]
pub struct CatalogCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CatalogCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let catalog = load_catalog(config)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(catalog.entries())?);
        } else {
            for entry in catalog.entries() {
                println!("{}", entry.name);
                println!("  keywords: {}", entry.keywords.join(", "));
                println!("  source patterns: {}", entry.source_patterns.join(", "));
            }
        }

        Ok(())
    }
}

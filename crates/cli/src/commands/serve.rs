//! Serve command handler.

use super::build_pipeline;
use clap::Args;
use reglens_core::{config::AppConfig, AppResult};
use std::sync::Arc;

/// Serve the question answering HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Socket address to bind (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        let mut server = config.server.clone();
        if let Some(ref bind) = self.bind {
            server.bind = bind.clone();
        }

        let pipeline = Arc::new(build_pipeline(config)?);
        reglens_server::serve(&server, pipeline).await
    }
}

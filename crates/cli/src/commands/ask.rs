//! Ask command handler.
//!
//! Runs one question through the answer pipeline.

use super::build_pipeline;
use clap::Args;
use reglens_core::{config::AppConfig, AppError, AppResult};
use reglens_pipeline::{ClaimStatus, PipelineResult};
use reglens_server::AskResponse;
use std::path::PathBuf;

/// Ask a question about the ingested regulations
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Output the HTTP response body as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let question = self.question_text()?;
        let pipeline = build_pipeline(config)?;
        let result = pipeline.run(&question).await?;

        if self.json {
            let response = AskResponse::from(result);
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            print_result(&result);
        }

        Ok(())
    }

    fn question_text(&self) -> AppResult<String> {
        let text = match (&self.question, &self.file) {
            (Some(question), _) => question.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read question file {:?}: {}", path, e))
            })?,
            (None, None) => String::new(),
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }
        Ok(text.to_string())
    }
}

fn print_result(result: &PipelineResult) {
    println!("{}", result.answer);
    println!();

    if result.sources.is_empty() {
        println!("Sources: (none retrieved)");
    } else {
        println!("Sources:");
        for source in &result.sources {
            println!("- {}, page {}", source.regulation, source.page);
        }
    }
    println!();

    let verification = &result.verification;
    println!(
        "Confidence: {:.2} ({} supported, {} partial, {} unsupported; {} pass(es), {})",
        result.confidence,
        verification.count(ClaimStatus::Supported),
        verification.count(ClaimStatus::Partial),
        verification.count(ClaimStatus::Unsupported),
        result.passes,
        result.query_type
    );
    if !verification.summary.is_empty() {
        println!("{}", verification.summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn command(question: Option<&str>, file: Option<PathBuf>) -> AskCommand {
        AskCommand {
            question: question.map(str::to_string),
            file,
            json: false,
        }
    }

    #[test]
    fn test_question_is_trimmed() {
        let cmd = command(Some("  What is SR 11-7?\n"), None);
        assert_eq!(cmd.question_text().unwrap(), "What is SR 11-7?");
    }

    #[test]
    fn test_question_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "What is ISO 42001?\n").unwrap();
        let cmd = command(None, Some(file.path().to_path_buf()));
        assert_eq!(cmd.question_text().unwrap(), "What is ISO 42001?");
    }

    #[test]
    fn test_missing_question() {
        assert!(command(None, None).question_text().is_err());
        assert!(command(Some("   "), None).question_text().is_err());
    }
}

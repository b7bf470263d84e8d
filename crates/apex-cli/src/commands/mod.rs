//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use apex_core::AnalysisMode;
use apex_gemini::retry::{DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_RETRIES};
use apex_gemini::{GeminiConfig, RetryPolicy};
use clap::{Parser, Subcommand, ValueEnum};

pub mod analyze;

/// APEX - X growth assistant
#[derive(Parser)]
#[command(name = "apex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Gemini model to use
    #[arg(long, global = true, env = "APEX_MODEL")]
    pub model: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Retries after a transient service failure
    #[arg(long, global = true, env = "APEX_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Base delay before the first retry, in milliseconds
    #[arg(long, global = true, env = "APEX_INITIAL_BACKOFF_MS", default_value_t = DEFAULT_INITIAL_BACKOFF_MS)]
    pub initial_backoff_ms: u64,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Suggest replies for a screenshot of a post
    Suggest(analyze::ImageArgs),

    /// Write a growth report from an analytics screenshot
    Report(analyze::ImageArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Terminal,
    Html,
    Json,
}

impl Cli {
    pub async fn execute(self) -> Result<ExitCode> {
        // Refuse to start without credentials.
        let mut config = GeminiConfig::from_env()?;
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }

        let policy = RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.initial_backoff_ms),
        );

        let (mode, args) = match self.command {
            Commands::Suggest(args) => (AnalysisMode::Suggestions, args),
            Commands::Report(args) => (AnalysisMode::Report, args),
        };

        analyze::execute(args, mode, config, policy, self.format).await
    }
}

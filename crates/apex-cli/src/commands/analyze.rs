//! `suggest` and `report`: send one screenshot and print the result.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use apex_core::{
    classify, Analysis, AnalysisMode, AnalysisRequest, ClassifiedError, ImageData, ImageMime,
    RawFailure,
};
use apex_gemini::{AnalysisService, GeminiClient, GeminiConfig, RetryPolicy};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinError;

use super::OutputFormat;
use crate::output;

/// Sent when neither the extension nor the magic bytes name a type, so
/// the service rejects it as invalid image data.
const UNKNOWN_MIME: &str = "application/octet-stream";

#[derive(Args)]
pub struct ImageArgs {
    /// Screenshot file (PNG, JPEG or GIF) or a `data:` URL
    pub image: String,
}

/// Where the screenshot comes from.
enum Upload {
    DataUrl(String),
    File { bytes: Vec<u8>, mime: String },
}

impl Upload {
    fn load(input: &str) -> Result<Self> {
        if input.starts_with("data:") {
            return Ok(Self::DataUrl(input.to_string()));
        }

        let path = PathBuf::from(input);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let mime = detect_mime(&path, &bytes);
        Ok(Self::File { bytes, mime })
    }
}

/// Extension first, then magic bytes.
fn detect_mime(path: &Path, bytes: &[u8]) -> String {
    ImageMime::from_path(path)
        .or_else(|| ImageMime::sniff(bytes))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_MIME.to_string())
}

pub async fn execute(
    args: ImageArgs,
    mode: AnalysisMode,
    config: GeminiConfig,
    policy: RetryPolicy,
    format: OutputFormat,
) -> Result<ExitCode> {
    let upload = Upload::load(&args.image)?;
    tracing::debug!(model = %config.model, ?policy, "Starting analysis");

    let client = GeminiClient::new(config)?;
    let service = Arc::new(AnalysisService::new(client, policy));

    let spinner = spinner(mode, format);
    let task = tokio::spawn(async move {
        match upload {
            Upload::DataUrl(url) => {
                let image = match ImageData::from_data_url(&url) {
                    Ok(image) => image,
                    Err(e) => return Err(ClassifiedError::from(e)),
                };
                service.analyze(AnalysisRequest { image, mode }).await
            }
            Upload::File { bytes, mime } => service.submit(bytes, &mime, mode).await,
        }
    });
    let result = task.await.unwrap_or_else(|e| Err(join_failure(e)));
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match result {
        Ok(analysis) => {
            print_analysis(&analysis, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            output::print_error(&err, format)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// A task that panicked or was cancelled still ends as a classified error.
fn join_failure(err: JoinError) -> ClassifiedError {
    if err.is_panic() {
        classify(RawFailure::from_panic(err.into_panic()))
    } else {
        classify(RawFailure::Opaque)
    }
}

/// Spinner on stderr; skipped for machine-readable output.
fn spinner(mode: AnalysisMode, format: OutputFormat) -> Option<ProgressBar> {
    if format != OutputFormat::Terminal {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(match mode {
        AnalysisMode::Suggestions => "Echo is reading the post...",
        AnalysisMode::Report => "APEX is reading your analytics...",
    });
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

fn print_analysis(analysis: &Analysis, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(analysis)?);
        }
        OutputFormat::Html => match analysis {
            Analysis::Suggestions(set) => {
                print!("{}", apex_core::render::html::suggestions_to_html(set));
            }
            Analysis::Report { markdown } => {
                print!("{}", apex_core::render::html::to_html(&markdown.render()));
            }
        },
        OutputFormat::Terminal => match analysis {
            Analysis::Suggestions(set) => output::print_suggestions(set),
            Analysis::Report { markdown } => output::print_blocks(&markdown.render()),
        },
    }
    Ok(())
}

//! Terminal output formatting.

use anyhow::Result;
use apex_core::render::{Block, Inline, Marker, Span, Tone};
use apex_core::{ClassifiedError, ReplyStyle, SuggestionSet};
use colored::{ColoredString, Colorize};
use unicode_width::UnicodeWidthStr;

use crate::commands::OutputFormat;

/// Print reply suggestions, one numbered card each.
pub fn print_suggestions(set: &SuggestionSet) {
    if set.is_empty() {
        println!("{}", "No suggestions returned.".dimmed());
        return;
    }

    println!("{}", "Reply suggestions".cyan().bold());
    println!();

    for (i, suggestion) in set.suggestions.iter().enumerate() {
        println!(
            "{} {}",
            format!("{}.", i + 1).dimmed(),
            style_badge(suggestion.reply_style(), &suggestion.style)
        );
        println!("   {}", suggestion.text);
        println!(
            "   {}",
            format!("{} chars", suggestion.text.chars().count()).dimmed()
        );
        println!();
    }
}

fn style_badge(style: ReplyStyle, tag: &str) -> ColoredString {
    let tag = format!("[{}]", tag.trim());
    match style {
        ReplyStyle::Insightful => tag.blue().bold(),
        ReplyStyle::Humorous => tag.yellow().bold(),
        ReplyStyle::Question => tag.magenta().bold(),
        ReplyStyle::Supportive => tag.green().bold(),
        ReplyStyle::Professional => tag.cyan().bold(),
        ReplyStyle::Sarcastic => tag.red().bold(),
        ReplyStyle::Other => tag.white().bold(),
    }
}

/// Print rendered report blocks.
pub fn print_blocks(blocks: &[Block]) {
    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let line = styled_inline(text);
                match level {
                    1 => {
                        println!();
                        println!("{}", line.bold().cyan());
                        println!("{}", "═".repeat(visual_width(text).min(term_width())).cyan());
                    }
                    2 => {
                        println!();
                        println!("{}", line.bold());
                    }
                    _ => println!("{}", line.bold().dimmed()),
                }
            }
            Block::List { items } => {
                for item in items {
                    println!("  {} {}", "•".cyan(), styled_inline(item));
                }
            }
            Block::Rule => println!("{}", "─".repeat(term_width().min(80)).dimmed()),
            Block::Paragraph { text } => println!("{}", styled_inline(text)),
        }
    }
}

/// Print the error panel. JSON output goes to stdout so callers can parse
/// it; the terminal panel goes to stderr.
pub fn print_error(err: &ClassifiedError, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "error": {
                    "category": err.category(),
                    "title": err.title(),
                    "description": err.description(),
                }
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Html => {
            println!(
                "<div class=\"error\"><h3>{}</h3><p>{}</p></div>",
                apex_core::render::html::escape(err.title()),
                apex_core::render::html::escape(err.description())
            );
        }
        OutputFormat::Terminal => {
            eprintln!();
            eprintln!("{} {}", "✗".red().bold(), err.title().red().bold());
            eprintln!("  {}", err.description());
        }
    }
    Ok(())
}

/// Inline spans as one ANSI-styled string.
fn styled_inline(inline: &Inline) -> String {
    let mut out = String::new();
    write_spans(inline.spans(), false, &mut out);
    out
}

fn write_spans(spans: &[Span], strong: bool, out: &mut String) {
    for span in spans {
        match span {
            Span::Text(text) if strong => out.push_str(&text.bold().to_string()),
            Span::Text(text) => out.push_str(text),
            Span::Strong(inner) => write_spans(inner, true, out),
            Span::Marker(marker) => out.push_str(&marker_glyph(*marker).to_string()),
            Span::Code(inner) => {
                let plain = Inline::from(inner.clone()).plain_text();
                out.push_str(&plain.on_bright_black().white().to_string());
            }
        }
    }
}

fn marker_glyph(marker: Marker) -> ColoredString {
    let glyph = marker.glyph().to_string();
    match marker.tone() {
        Tone::Positive => glyph.green(),
        Tone::Negative => glyph.red(),
        Tone::Warning => glyph.yellow(),
        Tone::Alert => glyph.red().bold(),
    }
}

fn visual_width(inline: &Inline) -> usize {
    UnicodeWidthStr::width(inline.plain_text().as_str())
}

/// Get terminal width, defaulting to 80.
fn term_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

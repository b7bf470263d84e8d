//! Markdown subset renderer.
//!
//! Turns model-written Markdown into typed blocks in a single forward pass
//! over the lines. Supported: `#`/`##`/`###` headings, `-`/`*` list items,
//! `---` rules, paragraphs, plus the inline markup in [`inline`].
//! Anything else degrades to a paragraph; rendering never fails.

pub mod html;
pub mod inline;

use serde::Serialize;

pub use inline::{Inline, Marker, Span, Tone};

/// One unit of rendered output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// `level` is 1, 2 or 3.
    Heading { level: u8, text: Inline },
    /// Consecutive list items, in order.
    List { items: Vec<Inline> },
    Rule,
    Paragraph { text: Inline },
}

/// Heading prefixes, longest first so `### ` never reads as `# `.
const HEADINGS: [(&str, u8); 3] = [("### ", 3), ("## ", 2), ("# ", 1)];

/// Render Markdown into blocks. Pure: the same input always yields the
/// same blocks.
pub fn render(markdown: &str) -> Vec<Block> {
    let mut out = BlockWriter::default();

    for raw in markdown.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let trimmed = line.trim();

        if let Some((level, rest)) = heading(line) {
            out.close_list();
            out.push(Block::Heading {
                level,
                text: Inline::parse(rest),
            });
        } else if trimmed.starts_with("---") {
            out.close_list();
            out.push(Block::Rule);
        } else if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            out.push_item(Inline::parse(item));
        } else if trimmed.is_empty() {
            out.close_list();
        } else {
            out.close_list();
            out.push(Block::Paragraph {
                text: Inline::parse(line),
            });
        }
    }

    out.finish()
}

fn heading(line: &str) -> Option<(u8, &str)> {
    HEADINGS
        .iter()
        .find_map(|(prefix, level)| line.strip_prefix(prefix).map(|rest| (*level, rest)))
}

#[derive(Default)]
struct BlockWriter {
    blocks: Vec<Block>,
    list: Option<Vec<Inline>>,
}

impl BlockWriter {
    fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    fn push_item(&mut self, item: Inline) {
        self.list.get_or_insert_with(Vec::new).push(item);
    }

    fn close_list(&mut self) {
        if let Some(items) = self.list.take() {
            self.blocks.push(Block::List { items });
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.close_list();
        self.blocks
    }
}
